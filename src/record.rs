//! Background worker that captures microphone audio and encodes it for upload.
//! The UI stays responsive while the capture loop runs; the finished take comes
//! back as a single message with the WAV bytes ready to post.

use crate::audio;
use crate::log_debug;
use crate::source::RecordedClip;
use anyhow::{anyhow, bail, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
#[cfg(test)]
use std::sync::OnceLock;
use std::thread;
use std::time::Instant;

/// Handle the UI uses to poll the worker thread for the finished clip.
pub struct RecordJob {
    pub receiver: mpsc::Receiver<RecordJobMessage>,
    pub handle: Option<thread::JoinHandle<()>>,
    /// Flag to signal the capture loop to stop and finalize the take.
    pub stop_flag: Arc<AtomicBool>,
}

impl RecordJob {
    /// Ask the capture loop to stop; the finished clip arrives on `receiver`.
    pub fn request_stop(&self) {
        self.stop_flag.store(true, Ordering::Relaxed);
    }
}

/// Messages sent from the worker back to the UI.
#[derive(Debug)]
pub enum RecordJobMessage {
    Clip(RecordedClip),
    Empty { metrics: audio::CaptureMetrics },
    Error(String),
}

/// Spawn a worker thread that records until stopped and encodes the take.
/// `recorder` is `None` when no input device came up at startup; the worker
/// reports that as an error so the UI can show it like any other failure.
pub fn start_record_job(
    recorder: Option<Arc<Mutex<audio::Recorder>>>,
    config: crate::config::AppConfig,
    meter: Option<audio::LiveMeter>,
) -> RecordJob {
    let (tx, rx) = mpsc::sync_channel(1);
    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_flag_clone = stop_flag.clone();

    let handle = thread::spawn(move || {
        // Do the heavy work off the UI thread and send back one message.
        let message = perform_record(recorder, &config, stop_flag_clone, meter);
        let _ = tx.send(message);
    });

    RecordJob {
        receiver: rx,
        handle: Some(handle),
        stop_flag,
    }
}

fn perform_record(
    recorder: Option<Arc<Mutex<audio::Recorder>>>,
    config: &crate::config::AppConfig,
    stop_flag: Arc<AtomicBool>,
    meter: Option<audio::LiveMeter>,
) -> RecordJobMessage {
    let capture_cfg = audio::CaptureConfig::from(config);
    let capture_start = Instant::now();
    let capture = match run_capture(recorder, &capture_cfg, stop_flag, meter) {
        Ok(capture) => capture,
        Err(err) => return RecordJobMessage::Error(format!("{err:#}")),
    };
    let capture_elapsed = capture_start.elapsed().as_secs_f64();

    let metrics = capture.metrics.clone();
    log_capture_metrics(&metrics);
    if capture.audio.is_empty() {
        log_debug("perform_record: empty capture");
        return RecordJobMessage::Empty { metrics };
    }

    let encode_start = Instant::now();
    let wav_bytes = match audio::encode_wav_mono16(&capture.audio, audio::TARGET_RATE) {
        Ok(bytes) => bytes,
        Err(err) => return RecordJobMessage::Error(format!("{err:#}")),
    };
    let encode_elapsed = encode_start.elapsed().as_secs_f64();
    let duration_ms = audio::duration_ms(capture.audio.len(), audio::TARGET_RATE);

    if config.log_timings {
        log_debug(&format!(
            "timing|phase=record|capture_s={capture_elapsed:.3}|encode_s={encode_elapsed:.3}|wav_bytes={}",
            wav_bytes.len()
        ));
        tracing::info!(
            target: "voxpilot",
            op = "record",
            capture_ms = metrics.capture_ms,
            wav_bytes = wav_bytes.len(),
            "recording finalized"
        );
    }

    RecordJobMessage::Clip(RecordedClip {
        wav_bytes,
        duration_ms,
        metrics,
    })
}

fn run_capture(
    recorder: Option<Arc<Mutex<audio::Recorder>>>,
    cfg: &audio::CaptureConfig,
    stop_flag: Arc<AtomicBool>,
    meter: Option<audio::LiveMeter>,
) -> Result<audio::CaptureResult> {
    #[cfg(test)]
    {
        if let Some(storage) = CAPTURE_HOOK.get() {
            let guard = storage.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(hook) = guard.as_ref() {
                return hook(cfg, stop_flag.clone());
            }
        }
    }
    let Some(recorder) = recorder else {
        bail!("no microphone available. {}", audio::mic_permission_hint());
    };
    let guard = recorder
        .lock()
        .map_err(|_| anyhow!("audio recorder lock poisoned"))?;
    guard.record_until_stopped(cfg, stop_flag, meter)
}

#[cfg(test)]
type CaptureHook = Box<
    dyn Fn(&audio::CaptureConfig, Arc<AtomicBool>) -> Result<audio::CaptureResult>
        + Send
        + 'static,
>;

#[cfg(test)]
static CAPTURE_HOOK: OnceLock<Mutex<Option<CaptureHook>>> = OnceLock::new();

#[cfg(test)]
pub(crate) fn set_capture_hook(hook: Option<CaptureHook>) {
    let storage = CAPTURE_HOOK.get_or_init(|| Mutex::new(None));
    *storage.lock().unwrap_or_else(|e| e.into_inner()) = hook;
}

/// Emit structured capture metrics for perf triage.
/// Format: `capture_metrics|capture_ms=...|frames_processed=...|frames_dropped=...|peak_db=...|stop=...`
pub(crate) fn log_capture_metrics(metrics: &audio::CaptureMetrics) {
    log_debug(&format!(
        "capture_metrics|capture_ms={}|frames_processed={}|frames_dropped={}|peak_db={:.1}|stop={}",
        metrics.capture_ms,
        metrics.frames_processed,
        metrics.frames_dropped,
        metrics.peak_db,
        metrics.stop_reason.label()
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{CaptureMetrics, CaptureResult, StopReason};
    use crate::config::AppConfig;
    use anyhow::anyhow;
    use clap::Parser;
    use std::time::Duration;

    static TEST_HOOK_GUARD: OnceLock<Mutex<()>> = OnceLock::new();

    fn test_config() -> AppConfig {
        let mut cfg = AppConfig::parse_from(["test-app"]);
        cfg.validate().expect("defaults should be valid");
        cfg
    }

    fn with_capture_hook<R>(hook: CaptureHook, f: impl FnOnce() -> R) -> R {
        let _guard = TEST_HOOK_GUARD
            .get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|e| e.into_inner());

        set_capture_hook(Some(hook));

        struct Reset;
        impl Drop for Reset {
            fn drop(&mut self) {
                set_capture_hook(None);
            }
        }
        let _reset = Reset; // clears hook even if f() panics

        f()
    }

    fn manual_stop_metrics(capture_ms: u64) -> CaptureMetrics {
        CaptureMetrics {
            capture_ms,
            stop_reason: StopReason::ManualStop,
            ..CaptureMetrics::default()
        }
    }

    #[test]
    fn empty_capture_reports_empty_message() {
        let config = test_config();
        let message = with_capture_hook(
            Box::new(|_, _| {
                Ok(CaptureResult {
                    audio: Vec::new(),
                    metrics: manual_stop_metrics(0),
                })
            }),
            || perform_record(None, &config, Arc::new(AtomicBool::new(false)), None),
        );

        match message {
            RecordJobMessage::Empty { metrics } => {
                assert_eq!(metrics.stop_reason, StopReason::ManualStop);
            }
            other => panic!("expected empty message, got {other:?}"),
        }
    }

    #[test]
    fn capture_is_encoded_as_wav_clip() {
        let config = test_config();
        let message = with_capture_hook(
            Box::new(|_, _| {
                Ok(CaptureResult {
                    audio: vec![0.0; 16_000],
                    metrics: manual_stop_metrics(1_000),
                })
            }),
            || perform_record(None, &config, Arc::new(AtomicBool::new(false)), None),
        );

        match message {
            RecordJobMessage::Clip(clip) => {
                assert_eq!(&clip.wav_bytes[..4], b"RIFF");
                assert_eq!(clip.duration_ms, 1_000);
                assert_eq!(clip.metrics.capture_ms, 1_000);
            }
            other => panic!("expected clip, got {other:?}"),
        }
    }

    #[test]
    fn capture_errors_surface_as_messages() {
        let config = test_config();
        let message = with_capture_hook(Box::new(|_, _| Err(anyhow!("device vanished"))), || {
            perform_record(None, &config, Arc::new(AtomicBool::new(false)), None)
        });

        match message {
            RecordJobMessage::Error(text) => {
                assert!(text.contains("device vanished"), "got {text}");
            }
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[test]
    fn missing_recorder_reports_helpful_error() {
        // Hold the hook guard so no other test's hook intercepts the capture.
        let _guard = TEST_HOOK_GUARD
            .get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|e| e.into_inner());

        let config = test_config();
        let message = perform_record(None, &config, Arc::new(AtomicBool::new(false)), None);

        match message {
            RecordJobMessage::Error(text) => {
                assert!(text.contains("no microphone available"), "got {text}");
            }
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[test]
    fn request_stop_reaches_the_capture_loop() {
        let config = test_config();
        let message = with_capture_hook(
            Box::new(|_, stop_flag| {
                // Simulated capture loop: wait for the stop signal.
                let started = Instant::now();
                while !stop_flag.load(Ordering::Relaxed) {
                    if started.elapsed() > Duration::from_secs(2) {
                        return Err(anyhow!("stop flag never set"));
                    }
                    thread::sleep(Duration::from_millis(5));
                }
                Ok(CaptureResult {
                    audio: vec![0.1; 1_600],
                    metrics: manual_stop_metrics(100),
                })
            }),
            || {
                let job = start_record_job(None, config.clone(), None);
                job.request_stop();
                let message = job
                    .receiver
                    .recv_timeout(Duration::from_secs(5))
                    .expect("worker should reply");
                if let Some(handle) = job.handle {
                    handle.join().expect("worker thread");
                }
                message
            },
        );

        match message {
            RecordJobMessage::Clip(clip) => assert_eq!(clip.duration_ms, 100),
            other => panic!("expected clip after stop, got {other:?}"),
        }
    }
}
