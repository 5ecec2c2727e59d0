//! Microphone capture and payload preparation.
//!
//! Audio is captured via CPAL between explicit start/stop toggles, downmixed
//! to mono, resampled to 16 kHz, and encoded as a WAV payload for upload.

/// Sample rate clips are uploaded at. Matches what the backend decodes to.
pub const TARGET_RATE: u32 = 16_000;

mod capture;
mod dispatch;
mod meter;
mod recorder;
mod resample;
mod wav;

pub use capture::{CaptureConfig, CaptureMetrics, CaptureResult, StopReason};
pub use meter::{rms_db, LiveMeter};
pub use recorder::{mic_permission_hint, Recorder};
pub use wav::{duration_ms, encode_wav_mono16};
