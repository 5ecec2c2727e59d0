//! System microphone recording via CPAL.
//!
//! Handles device enumeration, format conversion, and sample rate
//! normalization. Captured audio comes back as 16 kHz mono f32 PCM, ready to
//! encode into the upload payload.

use super::capture::{CaptureConfig, CaptureMetrics, CaptureResult};
#[cfg(not(test))]
use super::capture::{FrameAccumulator, StopReason, TakeClock};
use super::dispatch::append_downmixed_samples;
#[cfg(not(test))]
use super::dispatch::FrameDispatcher;
#[cfg(not(test))]
use super::meter::rms_db;
use super::meter::LiveMeter;
use super::resample::resample_to_target_rate;
use crate::log_debug;
use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use std::sync::atomic::AtomicBool;
#[cfg(not(test))]
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Audio input device wrapper.
///
/// Abstracts CPAL device handling and provides recording with automatic
/// format conversion and resampling.
pub struct Recorder {
    device: cpal::Device,
}

impl Recorder {
    /// List microphone names so the CLI can expose a human-friendly selector.
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();
        let devices = host.input_devices().context("no input devices available")?;
        let mut names = Vec::new();
        for device in devices {
            if let Ok(name) = device.name() {
                names.push(name);
            }
        }
        Ok(names)
    }

    /// Create a recorder, optionally matching a specific device so users can
    /// pick the right microphone when a laptop exposes multiple inputs.
    /// Matching is a case-insensitive substring of the device name.
    pub fn new(preferred_device: Option<&str>) -> Result<Self> {
        let host = cpal::default_host();
        let device = match preferred_device {
            Some(name) => {
                let needle = name.to_lowercase();
                let mut devices = host.input_devices().context("no input devices available")?;
                devices
                    .find(|d| {
                        d.name()
                            .map(|n| n.to_lowercase().contains(&needle))
                            .unwrap_or(false)
                    })
                    .ok_or_else(|| anyhow!("input device '{name}' not found"))?
            }
            None => host
                .default_input_device()
                .context("no default input device available")?,
        };
        Ok(Self { device })
    }

    /// Get the name of the active recording device.
    pub fn device_name(&self) -> String {
        self.device
            .name()
            .unwrap_or_else(|_| "Unknown Device".to_string())
    }

    /// Record for a fixed `duration` and return 16 kHz mono data. Used by the
    /// `mic_check` probe; the interactive path goes through
    /// [`Recorder::record_until_stopped`].
    pub fn record_for(&self, duration: Duration) -> Result<Vec<f32>> {
        // The device's default config tells us the native format and channel count.
        let default_config = self.device.default_input_config()?;
        let format = default_config.sample_format();
        let device_config: StreamConfig = default_config.clone().into();
        let device_sample_rate = device_config.sample_rate.0;
        let channels = usize::from(device_config.channels.max(1));
        let device_name = self
            .device
            .name()
            .unwrap_or_else(|_| "unknown input device".to_string());

        log_debug(&format!(
            "probe config: format={format:?} sample_rate={device_sample_rate}Hz channels={channels}"
        ));

        // cpal delivers samples on a callback thread; collect them in a shared
        // buffer so ownership stays on the caller side.
        let expected_samples =
            (duration.as_secs_f64() * device_sample_rate as f64 * channels as f64).ceil() as usize;
        let buffer = Arc::new(Mutex::new(Vec::<f32>::with_capacity(expected_samples)));
        let buffer_clone = buffer.clone();

        let err_fn = |err| log_debug(&format!("audio_stream_error: {err}"));

        // Convert every supported sample type to f32 up front so the rest of
        // the pipeline stays format-agnostic.
        let stream = match format {
            SampleFormat::F32 => self.device.build_input_stream(
                &device_config,
                move |data: &[f32], _| {
                    if let Ok(mut buf) = buffer_clone.lock() {
                        append_downmixed_samples(&mut buf, data, channels, |sample| sample);
                    }
                },
                err_fn,
                None,
            )?,
            SampleFormat::I16 => self.device.build_input_stream(
                &device_config,
                move |data: &[i16], _| {
                    if let Ok(mut buf) = buffer_clone.lock() {
                        append_downmixed_samples(&mut buf, data, channels, |sample| {
                            sample as f32 / 32_768.0_f32
                        });
                    }
                },
                err_fn,
                None,
            )?,
            SampleFormat::U16 => self.device.build_input_stream(
                &device_config,
                move |data: &[u16], _| {
                    if let Ok(mut buf) = buffer_clone.lock() {
                        append_downmixed_samples(&mut buf, data, channels, |sample| {
                            (sample as f32 - 32_768.0_f32) / 32_768.0_f32
                        });
                    }
                },
                err_fn,
                None,
            )?,
            other => return Err(anyhow!("unsupported sample format: {other:?}")),
        };

        stream.play()?;
        std::thread::sleep(duration);
        if let Err(err) = stream.pause() {
            log_debug(&format!("failed to pause audio stream: {err}"));
        }
        drop(stream);

        let samples = buffer
            .lock()
            .map_err(|_| anyhow!("audio buffer lock poisoned"))?;

        if samples.is_empty() {
            return Err(anyhow!(
                "no samples captured from '{device_name}'; check microphone permissions and availability. {}",
                mic_permission_hint()
            ));
        }

        Ok(resample_to_target_rate(&samples, device_sample_rate))
    }

    /// Record until the stop flag is raised or the configured cap runs out.
    ///
    /// This is the interactive take: frames stream in at the device rate, the
    /// live meter is fed per frame, and on stop the whole take is resampled to
    /// the upload rate in one pass.
    #[cfg(not(test))]
    pub fn record_until_stopped(
        &self,
        cfg: &CaptureConfig,
        stop_flag: Arc<AtomicBool>,
        meter: Option<LiveMeter>,
    ) -> Result<CaptureResult> {
        record_until_stopped_impl(self, cfg, stop_flag, meter)
    }

    #[cfg(test)]
    pub fn record_until_stopped(
        &self,
        _cfg: &CaptureConfig,
        _stop_flag: Arc<AtomicBool>,
        _meter: Option<LiveMeter>,
    ) -> Result<CaptureResult> {
        Ok(CaptureResult {
            audio: Vec::new(),
            metrics: CaptureMetrics::default(),
        })
    }

    #[cfg(test)]
    pub(super) fn new_for_tests() -> Option<Self> {
        let host = cpal::default_host();
        host.default_input_device().map(|device| Self { device })
    }
}

/// Per-platform pointer at the microphone permission switch, appended to
/// device failures so the alert tells the user where to look.
pub fn mic_permission_hint() -> &'static str {
    #[cfg(target_os = "macos")]
    {
        "macOS: System Settings > Privacy & Security > Microphone (enable your terminal)."
    }
    #[cfg(target_os = "linux")]
    {
        "Linux: check PipeWire/PulseAudio permissions and ensure the device is not muted."
    }
    #[cfg(target_os = "windows")]
    {
        "Windows: Settings > Privacy & Security > Microphone (allow access for your terminal)."
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        "Check OS microphone permissions."
    }
}

/// The take loop behind [`Recorder::record_until_stopped`].
///
/// Captures fixed-size frames off a bounded channel and stops when:
/// - the stop flag is raised (the user toggled recording off)
/// - the configured cap is reached (wall clock or full payload buffer)
/// - the stream disconnects
///
/// The stream lives only as long as the take; pausing and dropping it here is
/// what releases the device between recordings.
#[cfg(not(test))]
fn record_until_stopped_impl(
    recorder: &Recorder,
    cfg: &CaptureConfig,
    stop_flag: Arc<AtomicBool>,
    meter: Option<LiveMeter>,
) -> Result<CaptureResult> {
    use crossbeam_channel::{bounded, RecvTimeoutError};

    let default_config = recorder.device.default_input_config()?;
    let format = default_config.sample_format();
    let device_config: StreamConfig = default_config.clone().into();
    let device_sample_rate = device_config.sample_rate.0;
    let channels = usize::from(device_config.channels.max(1));
    let device_name = recorder
        .device
        .name()
        .unwrap_or_else(|_| "unknown input device".to_string());
    let frame_ms = cfg.frame_ms.clamp(5, 120);
    let device_frame_samples = ((u64::from(device_sample_rate) * frame_ms) / 1000).max(1) as usize;
    let (sender, receiver) = bounded::<Vec<f32>>(cfg.channel_capacity.max(1));
    let dropped = Arc::new(AtomicUsize::new(0));
    let dispatcher = Arc::new(Mutex::new(FrameDispatcher::new(
        device_frame_samples,
        sender,
        dropped.clone(),
    )));

    log_debug(&format!(
        "take config: format={format:?} rate={device_sample_rate}Hz channels={channels} frame_ms={frame_ms} cap_ms={}",
        cfg.max_capture_ms
    ));

    let err_fn = |err| log_debug(&format!("audio_stream_error: {err}"));
    let stream = match format {
        SampleFormat::F32 => {
            let dispatcher = dispatcher.clone();
            let dropped = dropped.clone();
            recorder.device.build_input_stream(
                &device_config,
                move |data: &[f32], _| {
                    if let Ok(mut pump) = dispatcher.try_lock() {
                        pump.push(data, channels, |sample| sample);
                    } else {
                        dropped.fetch_add(1, Ordering::Relaxed);
                    }
                },
                err_fn,
                None,
            )?
        }
        SampleFormat::I16 => {
            let dispatcher = dispatcher.clone();
            let dropped = dropped.clone();
            recorder.device.build_input_stream(
                &device_config,
                move |data: &[i16], _| {
                    if let Ok(mut pump) = dispatcher.try_lock() {
                        pump.push(data, channels, |sample| sample as f32 / 32_768.0);
                    } else {
                        dropped.fetch_add(1, Ordering::Relaxed);
                    }
                },
                err_fn,
                None,
            )?
        }
        SampleFormat::U16 => {
            let dispatcher = dispatcher.clone();
            let dropped = dropped.clone();
            recorder.device.build_input_stream(
                &device_config,
                move |data: &[u16], _| {
                    if let Ok(mut pump) = dispatcher.try_lock() {
                        pump.push(data, channels, |sample| {
                            (sample as f32 - 32_768.0) / 32_768.0
                        });
                    } else {
                        dropped.fetch_add(1, Ordering::Relaxed);
                    }
                },
                err_fn,
                None,
            )?
        }
        other => return Err(anyhow!("unsupported sample format: {other:?}")),
    };

    stream.play()?;

    let mut accumulator = FrameAccumulator::with_cap(device_sample_rate, cfg.max_capture_ms);
    let mut clock = TakeClock::new(cfg.max_capture_ms);
    let mut metrics = CaptureMetrics::default();
    let mut stop_reason = StopReason::MaxDuration;
    let wait_time = Duration::from_millis(frame_ms);

    while !clock.expired() {
        if stop_flag.load(Ordering::Relaxed) {
            stop_reason = StopReason::ManualStop;
            break;
        }
        match receiver.recv_timeout(wait_time) {
            Ok(frame) => {
                let level = rms_db(&frame);
                if let Some(ref meter) = meter {
                    meter.set_db(level);
                }
                metrics.frames_processed += 1;
                let full = accumulator.push_frame(&frame);
                if let Some(reason) = clock.on_frame(frame_ms, level) {
                    stop_reason = reason;
                    break;
                }
                if full {
                    stop_reason = StopReason::MaxDuration;
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                // Idle ticks count toward the cap so a stalled device cannot
                // hang the take.
                if let Some(reason) = clock.on_idle(frame_ms) {
                    stop_reason = reason;
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                stop_reason = StopReason::Error("audio stream disconnected".to_string());
                break;
            }
        }
    }

    if let Err(err) = stream.pause() {
        log_debug(&format!("failed to pause audio stream: {err}"));
    }
    drop(stream);
    if let Some(ref meter) = meter {
        meter.reset();
    }

    metrics.frames_dropped = dropped.load(Ordering::Relaxed);
    metrics.capture_ms = clock.total_ms();
    metrics.peak_db = clock.peak_db();
    metrics.stop_reason = stop_reason;

    if accumulator.is_empty() {
        if matches!(metrics.stop_reason, StopReason::ManualStop) {
            return Ok(CaptureResult {
                audio: Vec::new(),
                metrics,
            });
        }
        return Err(anyhow!(
            "no samples captured from '{device_name}'; check microphone permissions and availability. {}",
            mic_permission_hint()
        ));
    }

    log_debug(&format!(
        "take finished: {}ms {} frames ({} dropped) reason={}",
        metrics.capture_ms,
        metrics.frames_processed,
        metrics.frames_dropped,
        metrics.stop_reason.label()
    ));

    let audio = resample_to_target_rate(&accumulator.into_audio(), device_sample_rate);
    Ok(CaptureResult { audio, metrics })
}
