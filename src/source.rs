//! Submission sources: a microphone clip or a user-chosen audio file.
//!
//! Only one source is armed at a time. Finishing a recording clears any chosen
//! file and picking a file discards the recorded clip, so the submit path never
//! has to guess which payload the user meant.

use crate::audio::CaptureMetrics;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Filename the server sees for microphone captures.
pub const RECORDED_FILE_NAME: &str = "recording.wav";

const WAV_MIME: &str = "audio/wav";
const DEFAULT_MIME: &str = "application/octet-stream";

/// Finished microphone take, already encoded for upload.
#[derive(Debug, Clone)]
pub struct RecordedClip {
    pub wav_bytes: Vec<u8>,
    pub duration_ms: u64,
    pub metrics: CaptureMetrics,
}

impl RecordedClip {
    pub fn duration_label(&self) -> String {
        format!("{:.1}s", self.duration_ms as f64 / 1000.0)
    }
}

/// Audio file picked by the user, read from disk at submit time.
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub path: PathBuf,
}

impl SelectedFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Name sent to the server and shown in the UI.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".to_string())
    }

    pub fn mime_type(&self) -> &'static str {
        mime_for_extension(&self.path)
    }
}

/// What gets posted when the user hits submit.
#[derive(Debug, Clone)]
pub enum CaptureSource {
    Recording(RecordedClip),
    File(SelectedFile),
}

impl CaptureSource {
    /// Short label for the status line.
    pub fn label(&self) -> String {
        match self {
            CaptureSource::Recording(clip) => {
                format!("Recorded clip ({})", clip.duration_label())
            }
            CaptureSource::File(file) => file.file_name(),
        }
    }

    /// Materialize the upload body. File sources are read here so disk errors
    /// surface on the worker thread, not in the UI loop.
    pub fn upload_payload(&self) -> Result<UploadPayload> {
        match self {
            CaptureSource::Recording(clip) => Ok(UploadPayload {
                file_name: RECORDED_FILE_NAME.to_string(),
                mime_type: WAV_MIME.to_string(),
                bytes: clip.wav_bytes.clone(),
            }),
            CaptureSource::File(file) => {
                let bytes = fs::read(&file.path).with_context(|| {
                    format!("failed to read audio file '{}'", file.path.display())
                })?;
                Ok(UploadPayload {
                    file_name: file.file_name(),
                    mime_type: file.mime_type().to_string(),
                    bytes,
                })
            }
        }
    }
}

/// Bytes plus the multipart metadata the server expects.
#[derive(Debug, Clone)]
pub struct UploadPayload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

fn mime_for_extension(path: &Path) -> &'static str {
    let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
        return DEFAULT_MIME;
    };
    match ext.to_ascii_lowercase().as_str() {
        "wav" => WAV_MIME,
        "mp3" => "audio/mpeg",
        "ogg" => "audio/ogg",
        "flac" => "audio/flac",
        "m4a" => "audio/mp4",
        "webm" => "audio/webm",
        _ => DEFAULT_MIME,
    }
}
