//! Default values and hard bounds shared by CLI parsing and validation.

/// Base URL of the intent server when none is configured.
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000";

/// Hard cap on a single recording when --max-record-secs is absent.
pub const DEFAULT_MAX_RECORD_SECS: u64 = 30;

/// Capture frame size handed to the audio callback (milliseconds).
pub const DEFAULT_FRAME_MS: u64 = 20;

/// Frame channel capacity between the audio callback and the capture loop.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

pub(super) const MIN_RECORD_SECS: u64 = 1;
pub(super) const MAX_RECORD_SECS: u64 = 300;

pub(super) const MIN_FRAME_MS: u64 = 5;
pub(super) const MAX_FRAME_MS: u64 = 120;

pub(super) const MIN_CHANNEL_CAPACITY: usize = 8;
pub(super) const MAX_CHANNEL_CAPACITY: usize = 1024;

/// Upper bound on the configured server URL. Anything longer is a paste accident.
pub(super) const MAX_SERVER_URL_BYTES: usize = 2048;
