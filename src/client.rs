//! HTTP client for the intent server.
//!
//! One multipart POST per submission. The server owns decoding, transcription,
//! and classification, so the client's job is just to deliver bytes and parse
//! the JSON that comes back.

use crate::source::UploadPayload;
use crate::text;
use crate::{log_debug, log_debug_content};
use anyhow::{bail, Context, Result};
use reqwest::blocking::multipart::{Form, Part};
use serde::Deserialize;

/// Multipart field name the server reads the audio from.
pub const AUDIO_FIELD: &str = "audio";

/// Parsed body of a successful prediction.
#[derive(Debug, Clone, Deserialize)]
pub struct Prediction {
    #[serde(default)]
    pub transcription: String,
    #[serde(default)]
    pub intent: String,
    #[serde(default)]
    pub confidence: ConfidenceValue,
}

impl Prediction {
    /// Confidence as a 0..=1 fraction regardless of the wire representation.
    pub fn confidence_fraction(&self) -> f64 {
        self.confidence.as_fraction()
    }
}

/// The server formats confidence as a two-decimal string, but a bare number
/// is equally valid JSON. Accept both shapes.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ConfidenceValue {
    Number(f64),
    Text(String),
}

impl ConfidenceValue {
    pub fn as_fraction(&self) -> f64 {
        match self {
            ConfidenceValue::Number(value) => *value,
            ConfidenceValue::Text(text) => text.trim().parse().unwrap_or(0.0),
        }
    }

    /// Strict form used at the parse boundary: the text form must be numeric
    /// and either form must land in 0..=1.
    fn checked_fraction(&self) -> Result<f64> {
        let value = match self {
            ConfidenceValue::Number(value) => *value,
            ConfidenceValue::Text(text) => text
                .trim()
                .parse()
                .with_context(|| format!("confidence '{text}' is not a number"))?,
        };
        if !(0.0..=1.0).contains(&value) {
            bail!("confidence {value} is outside 0..=1");
        }
        Ok(value)
    }
}

impl Default for ConfidenceValue {
    fn default() -> Self {
        ConfidenceValue::Number(0.0)
    }
}

/// Blocking client bound to one /predict endpoint.
#[derive(Clone)]
pub struct PredictClient {
    endpoint: String,
    http: reqwest::blocking::Client,
}

impl PredictClient {
    /// `endpoint` is the full predict URL, e.g. `http://127.0.0.1:5000/predict`.
    pub fn new(endpoint: String) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { endpoint, http })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Post the payload and parse the server's reply. One request per submit,
    /// no retries and no client-side timeout; the model takes as long as it
    /// takes.
    pub fn predict(&self, payload: &UploadPayload) -> Result<Prediction> {
        let part = Part::bytes(payload.bytes.clone())
            .file_name(payload.file_name.clone())
            .mime_str(&payload.mime_type)
            .with_context(|| format!("invalid MIME type '{}'", payload.mime_type))?;
        let form = Form::new().part(AUDIO_FIELD, part);

        let response = self
            .http
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .with_context(|| format!("request to {} failed", self.endpoint))?;

        let status = response.status();
        let body = response.text().context("failed to read server response")?;

        if !status.is_success() {
            log_debug(&format!("predict_http_error|status={}", status.as_u16()));
            log_debug_content(&format!(
                "predict_error_body: {}",
                text::safe_prefix(&body, 200)
            ));
            bail!("server returned {status}");
        }

        parse_prediction(&body)
    }
}

fn parse_prediction(body: &str) -> Result<Prediction> {
    let prediction = match serde_json::from_str::<Prediction>(body) {
        Ok(prediction) => prediction,
        Err(err) => {
            log_debug(&format!("predict_parse_error: {err}"));
            log_debug_content(&format!(
                "predict_raw_body: {}",
                text::safe_prefix(body, 200)
            ));
            return Err(err).context("server reply was not valid prediction JSON");
        }
    };
    if let Err(err) = prediction.confidence.checked_fraction() {
        log_debug(&format!("predict_parse_error: {err:#}"));
        return Err(err).context("server reply was not valid prediction JSON");
    }
    Ok(prediction)
}
