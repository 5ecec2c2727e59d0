//! Screen state for the VoxPilot client.
//!
//! One controller owns the armed source, the record and submit workers, and
//! the session history. The render layer reads this state; key handling
//! mutates it. Workers never touch the UI directly: they hand back a single
//! message that `poll_jobs` folds into the state on the next tick.

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use voxpilot::audio::{LiveMeter, Recorder};
use voxpilot::client::PredictClient;
use voxpilot::config::AppConfig;
use voxpilot::history::{History, HistoryEntry};
use voxpilot::intent::format_confidence;
use voxpilot::source::{CaptureSource, SelectedFile};
use voxpilot::text::sanitize_server_text;
use voxpilot::{
    log_debug, start_record_job, start_submit_job, RecordJob, RecordJobMessage, SubmitJob,
    SubmitJobMessage,
};

use crate::intent_styles::IntentStyles;

/// Microphone lifecycle. Submission stays blocked until the take is back to
/// `Idle`; `Finalizing` covers the gap between the stop request and the
/// worker's reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RecordPhase {
    Idle,
    Recording,
    Finalizing,
}

pub(crate) struct App {
    pub(crate) config: AppConfig,
    recorder: Option<Arc<Mutex<Recorder>>>,
    client: PredictClient,
    pub(crate) styles: IntentStyles,
    pub(crate) phase: RecordPhase,
    record_job: Option<RecordJob>,
    submit_job: Option<SubmitJob>,
    pub(crate) meter: LiveMeter,
    record_started: Option<Instant>,
    pub(crate) source: Option<CaptureSource>,
    pub(crate) history: History,
    pub(crate) status: String,
    pub(crate) alert: Option<String>,
    pub(crate) show_help: bool,
    pub(crate) file_prompt: Option<String>,
    /// Draw ticks since startup, drives the busy spinner.
    pub(crate) tick: u64,
}

impl App {
    pub(crate) fn new(
        config: AppConfig,
        recorder: Option<Arc<Mutex<Recorder>>>,
        client: PredictClient,
        styles: IntentStyles,
    ) -> Self {
        let source = config
            .audio_file
            .clone()
            .map(|path| CaptureSource::File(SelectedFile::new(path)));
        let status = match &source {
            Some(source) => format!("Armed {}. Press s or Enter to send.", source.label()),
            None => "Press r to record or f to choose an audio file.".to_string(),
        };
        Self {
            config,
            recorder,
            client,
            styles,
            phase: RecordPhase::Idle,
            record_job: None,
            submit_job: None,
            meter: LiveMeter::new(),
            record_started: None,
            source,
            history: History::default(),
            status,
            alert: None,
            show_help: false,
            file_prompt: None,
            tick: 0,
        }
    }

    pub(crate) fn recording_active(&self) -> bool {
        !matches!(self.phase, RecordPhase::Idle)
    }

    pub(crate) fn submit_in_flight(&self) -> bool {
        self.submit_job.is_some()
    }

    pub(crate) fn record_elapsed_secs(&self) -> u64 {
        self.record_started
            .map(|started| started.elapsed().as_secs())
            .unwrap_or(0)
    }

    /// Start a take, or ask a running one to stop and finalize.
    pub(crate) fn toggle_record(&mut self) {
        match self.phase {
            RecordPhase::Idle => {
                self.meter.reset();
                let job = start_record_job(
                    self.recorder.clone(),
                    self.config.clone(),
                    Some(self.meter.clone()),
                );
                self.record_job = Some(job);
                self.record_started = Some(Instant::now());
                self.phase = RecordPhase::Recording;
                self.status = "Recording. Press r to stop.".to_string();
            }
            RecordPhase::Recording => {
                if let Some(job) = &self.record_job {
                    job.request_stop();
                }
                self.phase = RecordPhase::Finalizing;
                self.status = "Finishing the take...".to_string();
            }
            RecordPhase::Finalizing => {}
        }
    }

    /// Post the armed source. One submission at a time; the worker reply
    /// re-enables the action.
    pub(crate) fn submit(&mut self) {
        if self.submit_job.is_some() {
            self.status = "Already sending. Waiting for the server.".to_string();
            return;
        }
        if self.recording_active() {
            self.status = "Stop recording before sending.".to_string();
            return;
        }
        let Some(source) = self.source.clone() else {
            self.alert = Some("Record a clip or choose an audio file first.".to_string());
            return;
        };
        self.status = format!("Sending {} to the server...", source.label());
        self.submit_job = Some(start_submit_job(
            self.client.clone(),
            source,
            self.config.clone(),
        ));
    }

    pub(crate) fn begin_file_prompt(&mut self) {
        if self.recording_active() {
            self.status = "Stop recording before choosing a file.".to_string();
            return;
        }
        self.file_prompt = Some(String::new());
        self.status = "Type a path and press Enter, or Esc to cancel.".to_string();
    }

    pub(crate) fn confirm_file_prompt(&mut self) {
        let Some(raw) = self.file_prompt.take() else {
            return;
        };
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            self.status = "File selection cancelled.".to_string();
            return;
        }
        let path = PathBuf::from(trimmed);
        match fs::metadata(&path) {
            Ok(metadata) if metadata.is_file() => {
                let file = SelectedFile::new(path);
                self.status = format!("Armed {}. Press s or Enter to send.", file.file_name());
                // Choosing a file discards any recorded clip.
                self.source = Some(CaptureSource::File(file));
            }
            Ok(_) => {
                self.alert = Some(format!("'{trimmed}' is not a file."));
            }
            Err(err) => {
                self.alert = Some(format!("Cannot read '{trimmed}': {err}"));
            }
        }
    }

    pub(crate) fn cancel_file_prompt(&mut self) {
        self.file_prompt = None;
        self.status = "File selection cancelled.".to_string();
    }

    pub(crate) fn clear_source(&mut self) {
        if self.source.take().is_some() {
            self.status = "Discarded the armed source.".to_string();
        }
    }

    /// Drain worker replies. Called once per UI tick.
    pub(crate) fn poll_jobs(&mut self) {
        self.tick = self.tick.wrapping_add(1);

        let record_message = self
            .record_job
            .as_ref()
            .and_then(|job| job.receiver.try_recv().ok());
        if let Some(message) = record_message {
            self.handle_record_message(message);
        }

        let submit_message = self
            .submit_job
            .as_ref()
            .and_then(|job| job.receiver.try_recv().ok());
        if let Some(message) = submit_message {
            self.handle_submit_message(message);
        }
    }

    pub(crate) fn handle_record_message(&mut self, message: RecordJobMessage) {
        if let Some(mut job) = self.record_job.take() {
            if let Some(handle) = job.handle.take() {
                let _ = handle.join();
            }
        }
        self.phase = RecordPhase::Idle;
        self.record_started = None;
        self.meter.reset();

        match message {
            RecordJobMessage::Clip(clip) => {
                let label = clip.duration_label();
                let peak_db = clip.metrics.peak_db;
                // A finished take replaces any chosen file.
                self.source = Some(CaptureSource::Recording(clip));
                self.status = format!(
                    "Recorded clip armed ({label}, peak {peak_db:.1} dB). Press s or Enter to send."
                );
            }
            RecordJobMessage::Empty { .. } => {
                self.status = "Recording stopped with no audio captured.".to_string();
            }
            RecordJobMessage::Error(message) => {
                log_debug(&format!("record failed: {message}"));
                self.status = "Recording failed.".to_string();
                self.alert = Some(format!("Recording failed: {message}"));
            }
        }
    }

    pub(crate) fn handle_submit_message(&mut self, message: SubmitJobMessage) {
        if let Some(mut job) = self.submit_job.take() {
            if let Some(handle) = job.handle.take() {
                let _ = handle.join();
            }
        }

        match message {
            SubmitJobMessage::Prediction(prediction) => {
                let transcription = sanitize_server_text(&prediction.transcription);
                let intent = sanitize_server_text(&prediction.intent);
                let confidence = prediction.confidence_fraction();
                self.status = if intent.is_empty() {
                    "Reply received.".to_string()
                } else {
                    format!(
                        "Classified as {intent} ({}).",
                        format_confidence(confidence)
                    )
                };
                self.history
                    .prepend(HistoryEntry::new(transcription, intent, confidence));
            }
            SubmitJobMessage::Error(message) => {
                log_debug(&format!("submit failed: {message}"));
                self.status = "Submission failed.".to_string();
                self.alert = Some(format!("Submission failed: {message}"));
            }
        }
    }

    /// Route one key press. Returns true when the app should exit.
    pub(crate) fn on_key(&mut self, key: KeyEvent) -> bool {
        // A visible alert swallows the next key.
        if self.alert.take().is_some() {
            return false;
        }
        if self.show_help {
            self.show_help = false;
            return false;
        }
        if self.file_prompt.is_some() {
            self.on_prompt_key(key);
            return false;
        }

        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.prepare_quit();
                return true;
            }
            KeyCode::Char('q') | KeyCode::Esc => {
                self.prepare_quit();
                return true;
            }
            KeyCode::Char('r') => self.toggle_record(),
            KeyCode::Char('f') => self.begin_file_prompt(),
            KeyCode::Char('s') | KeyCode::Enter => self.submit(),
            KeyCode::Char('x') => self.clear_source(),
            KeyCode::Char('h') | KeyCode::Char('?') => self.show_help = true,
            _ => {}
        }
        false
    }

    fn on_prompt_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => self.confirm_file_prompt(),
            KeyCode::Esc => self.cancel_file_prompt(),
            KeyCode::Backspace => {
                if let Some(buffer) = self.file_prompt.as_mut() {
                    buffer.pop();
                }
            }
            KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                if let Some(buffer) = self.file_prompt.as_mut() {
                    buffer.push(ch);
                }
            }
            _ => {}
        }
    }

    /// Ask a live take to stop so the input stream is released before exit.
    fn prepare_quit(&mut self) {
        if let Some(job) = &self.record_job {
            job.request_stop();
        }
    }
}
