use super::defaults::{
    MAX_CHANNEL_CAPACITY, MAX_FRAME_MS, MAX_RECORD_SECS, MAX_SERVER_URL_BYTES,
    MIN_CHANNEL_CAPACITY, MIN_FRAME_MS, MIN_RECORD_SECS,
};
use super::AppConfig;
use anyhow::{bail, Context, Result};
use clap::Parser;
use std::{fs, path::Path};

impl AppConfig {
    /// Parse CLI arguments and validate them right away.
    pub fn parse_args() -> Result<Self> {
        let mut config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    /// Check CLI values and normalize the server URL.
    pub fn validate(&mut self) -> Result<()> {
        self.server_url = normalize_server_url(&self.server_url)?;

        if !(MIN_RECORD_SECS..=MAX_RECORD_SECS).contains(&self.max_record_secs) {
            bail!(
                "--max-record-secs must be between {MIN_RECORD_SECS} and {MAX_RECORD_SECS}, got {}",
                self.max_record_secs
            );
        }
        if !(MIN_FRAME_MS..=MAX_FRAME_MS).contains(&self.frame_ms) {
            bail!(
                "--frame-ms must be between {MIN_FRAME_MS} and {MAX_FRAME_MS}, got {}",
                self.frame_ms
            );
        }
        if !(MIN_CHANNEL_CAPACITY..=MAX_CHANNEL_CAPACITY).contains(&self.channel_capacity) {
            bail!(
                "--channel-capacity must be between {MIN_CHANNEL_CAPACITY} and {MAX_CHANNEL_CAPACITY}, got {}",
                self.channel_capacity
            );
        }

        if let Some(path) = &self.audio_file {
            require_readable_file(path, "--audio-file")?;
        }
        if let Some(path) = &self.intent_styles {
            require_readable_file(path, "--intent-styles")?;
        }

        Ok(())
    }

    /// Endpoint the audio payload is posted to.
    pub fn predict_url(&self) -> String {
        format!("{}/predict", self.server_url.trim_end_matches('/'))
    }
}

/// Accept an http(s) URL, trim stray whitespace, and drop trailing slashes so
/// endpoint joins stay unambiguous.
pub(super) fn normalize_server_url(value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        bail!("--server-url cannot be empty");
    }
    if trimmed.len() > MAX_SERVER_URL_BYTES {
        bail!("--server-url exceeds {MAX_SERVER_URL_BYTES} bytes");
    }
    if trimmed
        .chars()
        .any(|ch| ch.is_whitespace() || ch.is_control())
    {
        bail!("--server-url must not contain whitespace or control characters");
    }

    let rest = trimmed
        .strip_prefix("http://")
        .or_else(|| trimmed.strip_prefix("https://"));
    match rest {
        Some(host) if !host.trim_matches('/').is_empty() => {
            Ok(trimmed.trim_end_matches('/').to_string())
        }
        Some(_) => bail!("--server-url is missing a host, got '{trimmed}'"),
        None => bail!("--server-url must start with http:// or https://, got '{trimmed}'"),
    }
}

/// Require an existing regular file for path-valued flags.
pub(super) fn require_readable_file(path: &Path, flag: &str) -> Result<()> {
    let metadata = fs::metadata(path)
        .with_context(|| format!("failed to inspect {flag} '{}'", path.display()))?;
    if !metadata.is_file() {
        bail!("{flag} '{}' is not a file", path.display());
    }
    Ok(())
}
