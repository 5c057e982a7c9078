use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::audio::{DecodeError, decode_file};

/// Thresholds used to decide whether a file is a drum one-shot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OneShotCriteria {
    /// Files above this size are rejected before decoding.
    pub max_file_bytes: u64,
    pub max_duration_seconds: f64,
    /// Latest allowed position of the peak.
    pub max_attack_seconds: f64,
    /// Length of each RMS window following the peak.
    pub window_seconds: f64,
    pub window_count: usize,
    /// Consecutive window pairs that must strictly decrease in RMS.
    pub min_decreasing_pairs: usize,
    /// Mean |x| of the tail must stay below this fraction of the peak.
    pub max_tail_ratio: f32,
}

impl Default for OneShotCriteria {
    fn default() -> Self {
        Self {
            max_file_bytes: 2 * 1024 * 1024,
            max_duration_seconds: 2.0,
            max_attack_seconds: 0.05,
            window_seconds: 0.01,
            window_count: 10,
            min_decreasing_pairs: 7,
            max_tail_ratio: 0.1,
        }
    }
}

/// Outcome of the one-shot heuristic.
#[derive(Debug, Clone, PartialEq)]
pub enum OneShotVerdict {
    Accepted,
    TooLarge { bytes: u64 },
    TooLong { seconds: f64 },
    Silent,
    SlowAttack { peak_seconds: f64 },
    NoDecay { decreasing_pairs: usize },
    LoudTail { ratio: f32 },
}

impl OneShotVerdict {
    pub fn is_one_shot(&self) -> bool {
        matches!(self, OneShotVerdict::Accepted)
    }
}

/// Check size, then decode and classify the first channel of `path`.
pub fn is_likely_one_shot(
    path: &Path,
    criteria: &OneShotCriteria,
) -> Result<OneShotVerdict, DecodeError> {
    let bytes = std::fs::metadata(path)
        .map_err(|source| DecodeError::Open {
            path: path.to_path_buf(),
            source,
        })?
        .len();
    if bytes > criteria.max_file_bytes {
        return Ok(OneShotVerdict::TooLarge { bytes });
    }
    let decoded = decode_file(path)?;
    Ok(classify_one_shot(
        &decoded.channel(0),
        decoded.sample_rate,
        criteria,
    ))
}

/// Classify a single channel of PCM data.
///
/// A one-shot peaks early, decays across the windows after the peak and ends
/// in a near-silent tail.
pub fn classify_one_shot(
    channel: &[f32],
    sample_rate: u32,
    criteria: &OneShotCriteria,
) -> OneShotVerdict {
    let sample_rate = sample_rate.max(1);
    let seconds = channel.len() as f64 / sample_rate as f64;
    if seconds > criteria.max_duration_seconds {
        return OneShotVerdict::TooLong { seconds };
    }

    let Some((peak_index, peak)) = peak_position(channel) else {
        return OneShotVerdict::Silent;
    };
    let peak_seconds = peak_index as f64 / sample_rate as f64;
    if peak_seconds > criteria.max_attack_seconds {
        return OneShotVerdict::SlowAttack { peak_seconds };
    }

    let window = ((criteria.window_seconds * sample_rate as f64).round() as usize).max(1);
    let levels: Vec<f32> = (0..criteria.window_count)
        .map(|idx| {
            let start = (peak_index + idx * window).min(channel.len());
            let end = (start + window).min(channel.len());
            rms(&channel[start..end])
        })
        .collect();
    let decreasing_pairs = levels.windows(2).filter(|pair| pair[1] < pair[0]).count();

    let tail_start = (peak_index + criteria.window_count * window).min(channel.len());
    let ratio = mean_abs(&channel[tail_start..]) / peak;

    if decreasing_pairs < criteria.min_decreasing_pairs {
        return OneShotVerdict::NoDecay { decreasing_pairs };
    }
    if ratio >= criteria.max_tail_ratio {
        return OneShotVerdict::LoudTail { ratio };
    }
    OneShotVerdict::Accepted
}

fn peak_position(channel: &[f32]) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (idx, sample) in channel.iter().enumerate() {
        let value = sample.abs();
        if !value.is_finite() {
            continue;
        }
        if best.is_none_or(|(_, peak)| value > peak) {
            best = Some((idx, value));
        }
    }
    best.filter(|(_, peak)| *peak > 0.0)
}

fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|s| (*s as f64) * (*s as f64)).sum();
    (sum / samples.len() as f64).sqrt() as f32
}

fn mean_abs(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|s| s.abs() as f64).sum();
    (sum / samples.len() as f64) as f32
}
