use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Value the meter rests at when nothing is being captured.
pub(super) const METER_FLOOR_DB: f32 = -60.0;

/// Shared input level readout, written from the take loop and read by the UI.
///
/// Stores the dBFS value as raw bits in an atomic so neither side ever locks.
#[derive(Clone, Debug)]
pub struct LiveMeter {
    level_bits: Arc<AtomicU32>,
}

impl LiveMeter {
    pub fn new() -> Self {
        Self {
            level_bits: Arc::new(AtomicU32::new(METER_FLOOR_DB.to_bits())),
        }
    }

    pub fn set_db(&self, db: f32) {
        self.level_bits.store(db.to_bits(), Ordering::Relaxed);
    }

    pub fn level_db(&self) -> f32 {
        f32::from_bits(self.level_bits.load(Ordering::Relaxed))
    }

    pub fn reset(&self) {
        self.set_db(METER_FLOOR_DB);
    }
}

impl Default for LiveMeter {
    fn default() -> Self {
        Self::new()
    }
}

/// RMS level of a frame in dBFS, floored so silence does not hit -inf.
pub fn rms_db(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return METER_FLOOR_DB;
    }
    let energy: f32 = samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32;
    let rms = energy.sqrt().max(1e-6);
    20.0 * rms.log10()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_meter_defaults_to_floor() {
        let meter = LiveMeter::new();
        assert_eq!(meter.level_db(), METER_FLOOR_DB);
    }

    #[test]
    fn live_meter_updates_level() {
        let meter = LiveMeter::new();
        meter.set_db(-20.0);
        assert_eq!(meter.level_db(), -20.0);
    }

    #[test]
    fn live_meter_reset_returns_to_floor() {
        let meter = LiveMeter::new();
        meter.set_db(-5.0);
        meter.reset();
        assert_eq!(meter.level_db(), METER_FLOOR_DB);
    }

    #[test]
    fn rms_db_handles_empty() {
        assert_eq!(rms_db(&[]), METER_FLOOR_DB);
    }

    #[test]
    fn rms_db_full_scale_is_zero() {
        let frame = vec![1.0f32; 256];
        assert!(rms_db(&frame).abs() < 0.01);
    }
}
