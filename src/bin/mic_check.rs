//! Microphone diagnostic: record a few seconds and print level statistics.
//!
//! Useful when the main client reports capture failures. Runs outside the TUI
//! so CPAL errors and permission hints land on plain stderr.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use voxpilot::audio::{mic_permission_hint, rms_db, Recorder, TARGET_RATE};

/// 100 ms peak windows at the upload sample rate.
const PEAK_WINDOW_SAMPLES: usize = (TARGET_RATE as usize) / 10;

#[derive(Debug, Parser)]
#[command(about = "Record a short clip and print microphone level statistics")]
struct Args {
    /// Recording length in seconds
    #[arg(long, default_value_t = 3)]
    seconds: u64,

    /// Preferred audio input device name
    #[arg(long)]
    input_device: Option<String>,

    /// Print detected audio input devices and exit
    #[arg(long = "list-input-devices", default_value_t = false)]
    list_input_devices: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.list_input_devices {
        let devices = Recorder::list_devices()?;
        if devices.is_empty() {
            println!("No audio input devices detected.");
        } else {
            println!("Available audio input devices:");
            for name in devices {
                println!("  - {name}");
            }
        }
        return Ok(());
    }

    let recorder = Recorder::new(args.input_device.as_deref())
        .with_context(|| format!("no usable input device. {}", mic_permission_hint()))?;

    println!(
        "Recording {} second(s) from '{}'...",
        args.seconds,
        recorder.device_name()
    );
    let samples = recorder.record_for(Duration::from_secs(args.seconds))?;

    let duration_secs = samples.len() as f32 / TARGET_RATE as f32;
    let overall_db = rms_db(&samples);
    let peak_db = peak_window_db(&samples, PEAK_WINDOW_SAMPLES);

    println!(
        "Captured {} samples ({duration_secs:.1} s at {TARGET_RATE} Hz).",
        samples.len()
    );
    println!("Overall level: {overall_db:.1} dBFS");
    println!("Loudest 100 ms window: {peak_db:.1} dBFS");
    if let Some(hint) = level_hint(peak_db) {
        println!("{hint}");
    }

    Ok(())
}

/// Loudest short window, so one utterance is not averaged away by the
/// surrounding silence.
fn peak_window_db(samples: &[f32], window: usize) -> f32 {
    if window == 0 {
        return rms_db(samples);
    }
    samples
        .chunks(window)
        .map(rms_db)
        .fold(rms_db(&[]), f32::max)
}

fn level_hint(peak_db: f32) -> Option<&'static str> {
    if peak_db <= -50.0 {
        Some("Input is near silence. Check that the microphone is unmuted and selected.")
    } else if peak_db <= -35.0 {
        Some("Input is quiet. Raise the input gain or speak closer to the microphone.")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn defaults_record_three_seconds() {
        let args = Args::try_parse_from(["mic_check"]).unwrap();
        assert_eq!(args.seconds, 3);
        assert!(args.input_device.is_none());
        assert!(!args.list_input_devices);
    }

    #[test]
    fn peak_window_picks_the_loud_section() {
        let mut samples = vec![0.0f32; TARGET_RATE as usize];
        samples.extend(std::iter::repeat(0.5f32).take(PEAK_WINDOW_SAMPLES));

        let peak = peak_window_db(&samples, PEAK_WINDOW_SAMPLES);
        let overall = rms_db(&samples);
        assert!(peak > -7.0, "peak {peak} dB should reflect the loud window");
        assert!(overall < peak, "overall {overall} dB should be dragged down");
    }

    #[test]
    fn silence_reads_as_near_silence() {
        let peak = peak_window_db(&vec![0.0f32; 3_200], 1_600);
        assert!(peak <= -100.0);
        assert_eq!(
            level_hint(peak),
            Some("Input is near silence. Check that the microphone is unmuted and selected.")
        );
    }

    #[test]
    fn healthy_levels_need_no_hint() {
        assert!(level_hint(-12.0).is_none());
        assert!(level_hint(-40.0).is_some());
    }
}
