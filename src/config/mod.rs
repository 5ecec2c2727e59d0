//! Command-line parsing and validation helpers.

mod defaults;
mod validation;

use clap::Parser;
use std::path::PathBuf;

pub use defaults::{
    DEFAULT_CHANNEL_CAPACITY, DEFAULT_FRAME_MS, DEFAULT_MAX_RECORD_SECS, DEFAULT_SERVER_URL,
};

/// CLI options for the VoxPilot client. Validated values keep the capture
/// pipeline and the server request path predictable.
#[derive(Debug, Parser, Clone)]
#[command(about = "VoxPilot voice command client", author, version)]
pub struct AppConfig {
    /// Base URL of the intent server
    #[arg(
        long = "server-url",
        env = "VOXPILOT_SERVER_URL",
        default_value = DEFAULT_SERVER_URL
    )]
    pub server_url: String,

    /// Preferred audio input device name
    #[arg(long)]
    pub input_device: Option<String>,

    /// Print detected audio input devices and exit
    #[arg(long = "list-input-devices", default_value_t = false)]
    pub list_input_devices: bool,

    /// Audio file preselected as the submission source at startup
    #[arg(long = "audio-file", value_name = "PATH")]
    pub audio_file: Option<PathBuf>,

    /// Hard cap on a single recording (seconds)
    #[arg(long = "max-record-secs", default_value_t = DEFAULT_MAX_RECORD_SECS)]
    pub max_record_secs: u64,

    /// Capture frame size (milliseconds)
    #[arg(long = "frame-ms", default_value_t = DEFAULT_FRAME_MS)]
    pub frame_ms: u64,

    /// Frame channel capacity between the audio callback and the capture loop
    #[arg(long = "channel-capacity", default_value_t = DEFAULT_CHANNEL_CAPACITY)]
    pub channel_capacity: usize,

    /// Extra intent styling rules (YAML)
    #[arg(
        long = "intent-styles",
        env = "VOXPILOT_INTENT_STYLES",
        value_name = "PATH"
    )]
    pub intent_styles: Option<PathBuf>,

    /// Enable file logging (debug)
    #[arg(long = "logs", env = "VOXPILOT_LOGS", default_value_t = false)]
    pub logs: bool,

    /// Disable all file logging (overrides --logs and log env vars)
    #[arg(long = "no-logs", env = "VOXPILOT_NO_LOGS", default_value_t = false)]
    pub no_logs: bool,

    /// Allow logging transcription snippets (debug log only)
    #[arg(
        long = "log-content",
        env = "VOXPILOT_LOG_CONTENT",
        default_value_t = false
    )]
    pub log_content: bool,

    /// Enable verbose timing logs
    #[arg(long)]
    pub log_timings: bool,
}
