//! In-memory WAV encoding for the upload payload.
//!
//! The backend accepts anything its decoder can read, but recorded takes are
//! always shipped as 16-bit mono PCM at the upload rate so the payload is
//! small and unambiguous.

use anyhow::{Context, Result};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::io::Cursor;

/// Encode mono f32 PCM into a complete WAV file in memory.
///
/// Samples are clamped to [-1, 1] before conversion so an over-driven mic
/// clips instead of wrapping around.
pub fn encode_wav_mono16(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    let mut writer =
        WavWriter::new(&mut cursor, spec).context("failed to start wav payload")?;
    for &sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16;
        writer
            .write_sample(value)
            .context("failed to write wav sample")?;
    }
    writer.finalize().context("failed to finalize wav payload")?;
    Ok(cursor.into_inner())
}

/// Duration of a mono sample buffer at the given rate, in milliseconds.
pub fn duration_ms(sample_count: usize, sample_rate: u32) -> u64 {
    if sample_rate == 0 {
        return 0;
    }
    (sample_count as u64).saturating_mul(1_000) / u64::from(sample_rate)
}
