//! On-demand level and waveform analysis for catalogued samples.

use thiserror::Error;
use tracing::debug;

use crate::audio::{DecodeError, DecodedAudio, decode_file};
use crate::catalog::{AudioDetails, CatalogError, CatalogStore, Sample, SampleId};

/// Number of buckets in the waveform overview.
pub const PEAK_BUCKETS: usize = 100;

/// Level reported for digital silence.
pub const SILENCE_DB: f64 = -120.0;

#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Decodes samples and stores their level and waveform data.
#[derive(Debug, Default, Clone, Copy)]
pub struct SampleAnalyzer;

impl SampleAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Analyze `id` and persist the result, returning the updated sample.
    ///
    /// Stored fields are left untouched when the file cannot be decoded.
    pub fn analyze(&self, store: &CatalogStore, id: &SampleId) -> Result<Sample, AnalyzeError> {
        let sample = store
            .get_sample(id)?
            .ok_or_else(|| CatalogError::SampleNotFound(id.clone()))?;
        let file = store.get_file(&sample.path, &sample.directory_id)?;
        let decoded = decode_file(&file.path)?;
        let details = analyze_audio(&decoded);
        debug!(sample = %id, rms_db = ?details.rms_db, "Sample analyzed");
        Ok(store.update_sample_analysis(id, &details)?)
    }
}

/// Compute stream facts, RMS level and the peak overview of decoded audio.
pub fn analyze_audio(audio: &DecodedAudio) -> AudioDetails {
    let first = audio.channel(0);
    AudioDetails {
        duration_seconds: Some(audio.duration_seconds()),
        channels: Some(audio.channels),
        sample_rate: Some(audio.sample_rate),
        rms_db: Some(rms_db(&first)),
        peaks: Some(peak_buckets(&first, PEAK_BUCKETS)),
    }
}

/// RMS level in dBFS, floored at [`SILENCE_DB`].
pub fn rms_db(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return SILENCE_DB;
    }
    let sum: f64 = samples.iter().map(|s| (*s as f64) * (*s as f64)).sum();
    let rms = (sum / samples.len() as f64).sqrt();
    if rms <= 0.0 || !rms.is_finite() {
        return SILENCE_DB;
    }
    (20.0 * rms.log10()).max(SILENCE_DB)
}

/// Max |x| over `buckets` equal slices, clamped to `[0, 1]`; empty slices are zero.
pub fn peak_buckets(samples: &[f32], buckets: usize) -> Vec<f32> {
    let len = samples.len();
    (0..buckets)
        .map(|bucket| {
            let start = bucket * len / buckets;
            let end = (bucket + 1) * len / buckets;
            samples[start..end]
                .iter()
                .map(|s| s.abs())
                .filter(|s| s.is_finite())
                .fold(0.0f32, f32::max)
                .clamp(0.0, 1.0)
        })
        .collect()
}
