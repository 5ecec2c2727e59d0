//! Capture bookkeeping shared by the recorder and the record worker.
//!
//! Tracks how long a take has been running against the configured cap,
//! accumulates frames into the payload buffer, and carries the metrics that
//! end up in the status line and the debug log.

use super::TARGET_RATE;

/// Tunables for one recording take, mirrored from the CLI config.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureConfig {
    /// Upload sample rate the payload is resampled to.
    pub sample_rate: u32,
    /// Size of the frames the input callback is sliced into.
    pub frame_ms: u64,
    /// Hard cap on a single take.
    pub max_capture_ms: u64,
    /// Bounded frame-channel depth between the callback and the take loop.
    pub channel_capacity: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: TARGET_RATE,
            frame_ms: 20,
            max_capture_ms: 30_000,
            channel_capacity: 64,
        }
    }
}

impl From<&crate::config::AppConfig> for CaptureConfig {
    fn from(cfg: &crate::config::AppConfig) -> Self {
        Self {
            sample_rate: TARGET_RATE,
            frame_ms: cfg.frame_ms,
            max_capture_ms: cfg.max_record_secs.saturating_mul(1_000),
            channel_capacity: cfg.channel_capacity,
        }
    }
}

/// Metrics collected during one take, for the status line and the debug log.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureMetrics {
    pub capture_ms: u64,
    pub frames_processed: usize,
    pub frames_dropped: usize,
    pub peak_db: f32,
    pub stop_reason: StopReason,
}

impl Default for CaptureMetrics {
    fn default() -> Self {
        Self {
            capture_ms: 0,
            frames_processed: 0,
            frames_dropped: 0,
            peak_db: super::meter::METER_FLOOR_DB,
            stop_reason: StopReason::MaxDuration,
        }
    }
}

/// Why a take ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    ManualStop,
    MaxDuration,
    Error(String),
}

impl StopReason {
    pub fn label(&self) -> &'static str {
        match self {
            StopReason::ManualStop => "manual_stop",
            StopReason::MaxDuration => "max_duration",
            StopReason::Error(_) => "error",
        }
    }
}

/// Caller-facing result: mono PCM at the upload rate plus take metrics.
#[derive(Debug, Clone)]
pub struct CaptureResult {
    pub audio: Vec<f32>,
    pub metrics: CaptureMetrics,
}

/// Collects device-rate frames into the payload buffer.
///
/// The buffer never grows past the configured cap; `push_frame` reports when
/// the cap is reached so the take loop can stop instead of silently dropping
/// the tail of what the user said.
pub(super) struct FrameAccumulator {
    samples: Vec<f32>,
    pub(super) max_samples: usize,
}

impl FrameAccumulator {
    pub(super) fn with_cap(device_rate: u32, max_capture_ms: u64) -> Self {
        let max_samples = ((u64::from(device_rate) * max_capture_ms) / 1000).max(1) as usize;
        Self {
            samples: Vec::new(),
            max_samples,
        }
    }

    #[cfg(test)]
    pub(crate) fn for_testing(max_samples: usize) -> Self {
        Self {
            samples: Vec::new(),
            max_samples,
        }
    }

    /// Appends a frame, truncating at the cap. Returns true once the buffer
    /// is full.
    pub(super) fn push_frame(&mut self, frame: &[f32]) -> bool {
        let room = self.max_samples.saturating_sub(self.samples.len());
        if room == 0 {
            return true;
        }
        let take = frame.len().min(room);
        self.samples.extend_from_slice(&frame[..take]);
        self.samples.len() >= self.max_samples
    }

    pub(super) fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub(super) fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub(super) fn into_audio(self) -> Vec<f32> {
        self.samples
    }
}

/// Tracks take progress and decides when the cap forces a stop.
///
/// Time advances for every frame received and for every empty poll tick, so a
/// device that goes quiet still runs the take out instead of hanging it.
pub(super) struct TakeClock {
    max_ms: u64,
    total_ms: u64,
    peak_db: f32,
}

impl TakeClock {
    pub(super) fn new(max_ms: u64) -> Self {
        Self {
            max_ms,
            total_ms: 0,
            peak_db: super::meter::METER_FLOOR_DB,
        }
    }

    /// Accounts one received frame and its level.
    pub(super) fn on_frame(&mut self, frame_ms: u64, level_db: f32) -> Option<StopReason> {
        if level_db > self.peak_db {
            self.peak_db = level_db;
        }
        self.advance(frame_ms)
    }

    /// Accounts an empty poll tick.
    pub(super) fn on_idle(&mut self, waited_ms: u64) -> Option<StopReason> {
        self.advance(waited_ms)
    }

    fn advance(&mut self, elapsed_ms: u64) -> Option<StopReason> {
        self.total_ms = self.total_ms.saturating_add(elapsed_ms);
        if self.total_ms >= self.max_ms {
            Some(StopReason::MaxDuration)
        } else {
            None
        }
    }

    pub(super) fn expired(&self) -> bool {
        self.total_ms >= self.max_ms
    }

    pub(super) fn total_ms(&self) -> u64 {
        self.total_ms
    }

    pub(super) fn peak_db(&self) -> f32 {
        self.peak_db
    }
}
