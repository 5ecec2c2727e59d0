//! Background worker that posts the armed capture source to the intent server.
//! One request per submission, no retries; the UI polls for the single reply
//! message and keeps the submit action disabled until it lands.

use crate::client::{PredictClient, Prediction};
use crate::source::{CaptureSource, UploadPayload};
use crate::text;
use crate::{log_debug, log_debug_content};
use anyhow::Result;
use std::sync::mpsc;
#[cfg(test)]
use std::sync::{Mutex, OnceLock};
use std::thread;
use std::time::Instant;

/// Handle the UI uses to poll the worker thread for the server's verdict.
pub struct SubmitJob {
    pub receiver: mpsc::Receiver<SubmitJobMessage>,
    pub handle: Option<thread::JoinHandle<()>>,
}

/// Messages sent from the worker back to the UI.
#[derive(Debug)]
pub enum SubmitJobMessage {
    Prediction(Prediction),
    Error(String),
}

/// Spawn a worker thread that uploads the source and parses the reply.
pub fn start_submit_job(
    client: PredictClient,
    source: CaptureSource,
    config: crate::config::AppConfig,
) -> SubmitJob {
    let (tx, rx) = mpsc::sync_channel(1);

    let handle = thread::spawn(move || {
        // File reads and the HTTP round trip happen off the UI thread.
        let message = perform_submit(&client, &source, &config);
        let _ = tx.send(message);
    });

    SubmitJob {
        receiver: rx,
        handle: Some(handle),
    }
}

fn perform_submit(
    client: &PredictClient,
    source: &CaptureSource,
    config: &crate::config::AppConfig,
) -> SubmitJobMessage {
    let prepare_start = Instant::now();
    let payload = match source.upload_payload() {
        Ok(payload) => payload,
        Err(err) => return SubmitJobMessage::Error(format!("{err:#}")),
    };
    let prepare_elapsed = prepare_start.elapsed().as_secs_f64();
    log_debug(&format!(
        "submit_payload|file={}|bytes={}",
        payload.file_name,
        payload.bytes.len()
    ));

    let request_start = Instant::now();
    match run_predict(client, &payload) {
        Ok(prediction) => {
            let request_elapsed = request_start.elapsed().as_secs_f64();
            log_debug(&format!(
                "submit_ok|intent={}|confidence={:.2}",
                prediction.intent,
                prediction.confidence_fraction()
            ));
            log_debug_content(&format!(
                "transcription: {}",
                text::safe_prefix(&prediction.transcription, 120)
            ));
            if config.log_timings {
                log_debug(&format!(
                    "timing|phase=submit|prepare_s={prepare_elapsed:.3}|request_s={request_elapsed:.3}|bytes={}",
                    payload.bytes.len()
                ));
                tracing::info!(
                    target: "voxpilot",
                    op = "submit",
                    request_ms = (request_elapsed * 1000.0) as u64,
                    bytes = payload.bytes.len(),
                    intent = %prediction.intent,
                    "prediction received"
                );
            }
            SubmitJobMessage::Prediction(prediction)
        }
        Err(err) => {
            log_debug(&format!("submit_error: {err:#}"));
            SubmitJobMessage::Error(format!("{err:#}"))
        }
    }
}

fn run_predict(client: &PredictClient, payload: &UploadPayload) -> Result<Prediction> {
    #[cfg(test)]
    {
        if let Some(storage) = PREDICT_HOOK.get() {
            let guard = storage.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(hook) = guard.as_ref() {
                return hook(payload);
            }
        }
    }
    client.predict(payload)
}

#[cfg(test)]
type PredictHook = Box<dyn Fn(&UploadPayload) -> Result<Prediction> + Send + 'static>;

#[cfg(test)]
static PREDICT_HOOK: OnceLock<Mutex<Option<PredictHook>>> = OnceLock::new();

#[cfg(test)]
pub(crate) fn set_predict_hook(hook: Option<PredictHook>) {
    let storage = PREDICT_HOOK.get_or_init(|| Mutex::new(None));
    *storage.lock().unwrap_or_else(|e| e.into_inner()) = hook;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ConfidenceValue;
    use crate::config::AppConfig;
    use crate::source::{RecordedClip, SelectedFile};
    use anyhow::anyhow;
    use clap::Parser;
    use std::path::PathBuf;
    use std::time::Duration;

    static TEST_HOOK_GUARD: OnceLock<Mutex<()>> = OnceLock::new();

    fn test_config() -> AppConfig {
        let mut cfg = AppConfig::parse_from(["test-app"]);
        cfg.validate().expect("defaults should be valid");
        cfg
    }

    fn test_client() -> PredictClient {
        PredictClient::new("http://127.0.0.1:1/predict".to_string()).expect("client")
    }

    fn recorded_source() -> CaptureSource {
        CaptureSource::Recording(RecordedClip {
            wav_bytes: vec![1, 2, 3, 4],
            duration_ms: 800,
            metrics: crate::audio::CaptureMetrics::default(),
        })
    }

    fn prediction(intent: &str) -> Prediction {
        Prediction {
            transcription: "tourne a gauche".to_string(),
            intent: intent.to_string(),
            confidence: ConfidenceValue::Text("0.91".to_string()),
        }
    }

    fn with_predict_hook<R>(hook: PredictHook, f: impl FnOnce() -> R) -> R {
        let _guard = TEST_HOOK_GUARD
            .get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|e| e.into_inner());

        set_predict_hook(Some(hook));

        struct Reset;
        impl Drop for Reset {
            fn drop(&mut self) {
                set_predict_hook(None);
            }
        }
        let _reset = Reset; // clears hook even if f() panics

        f()
    }

    #[test]
    fn successful_submit_returns_prediction() {
        let config = test_config();
        let message = with_predict_hook(
            Box::new(|payload| {
                assert_eq!(payload.file_name, "recording.wav");
                Ok(prediction("GAUCHE"))
            }),
            || perform_submit(&test_client(), &recorded_source(), &config),
        );

        match message {
            SubmitJobMessage::Prediction(prediction) => {
                assert_eq!(prediction.intent, "GAUCHE");
                assert!((prediction.confidence_fraction() - 0.91).abs() < 1e-9);
            }
            other => panic!("expected prediction, got {other:?}"),
        }
    }

    #[test]
    fn predict_errors_surface_as_messages() {
        let config = test_config();
        let message = with_predict_hook(Box::new(|_| Err(anyhow!("connection refused"))), || {
            perform_submit(&test_client(), &recorded_source(), &config)
        });

        match message {
            SubmitJobMessage::Error(text) => {
                assert!(text.contains("connection refused"), "got {text}");
            }
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[test]
    fn unreadable_file_fails_before_any_request() {
        let config = test_config();
        let source = CaptureSource::File(SelectedFile::new(PathBuf::from(
            "/nonexistent/voxpilot-gone.wav",
        )));
        let message = with_predict_hook(
            Box::new(|_| panic!("request must not be attempted")),
            || perform_submit(&test_client(), &source, &config),
        );

        match message {
            SubmitJobMessage::Error(text) => {
                assert!(text.contains("voxpilot-gone.wav"), "got {text}");
            }
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[test]
    fn start_submit_job_delivers_one_message() {
        let config = test_config();
        let message = with_predict_hook(Box::new(|_| Ok(prediction("STOP"))), || {
            let job = start_submit_job(test_client(), recorded_source(), config.clone());
            let message = job
                .receiver
                .recv_timeout(Duration::from_secs(5))
                .expect("worker should reply");
            if let Some(handle) = job.handle {
                handle.join().expect("worker thread");
            }
            message
        });

        match message {
            SubmitJobMessage::Prediction(prediction) => assert_eq!(prediction.intent, "STOP"),
            other => panic!("expected prediction, got {other:?}"),
        }
    }
}
