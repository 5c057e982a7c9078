use serde::{Deserialize, Serialize};

use crate::audio::DecodedAudio;

/// Per-sample edits baked into the exported audio.
///
/// Times are in seconds of the source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditParams {
    pub start_time: f64,
    pub end_time: f64,
    /// Linear gain. With `normalize` it multiplies the normalized clip.
    pub gain: f32,
    pub fade_in: f64,
    pub fade_out: f64,
    pub normalize: bool,
    pub reverse: bool,
}

impl EditParams {
    /// Identity edit spanning `duration_seconds`.
    pub fn full(duration_seconds: f64) -> Self {
        Self {
            start_time: 0.0,
            end_time: duration_seconds.max(0.0),
            gain: 1.0,
            fade_in: 0.0,
            fade_out: 0.0,
            normalize: false,
            reverse: false,
        }
    }

    /// Frame range `[start, end)` at `sample_rate`, clamped to `total_frames`.
    pub fn frame_range(&self, sample_rate: u32, total_frames: usize) -> (usize, usize) {
        let to_frame = |seconds: f64| -> usize {
            let frame = (seconds.max(0.0) * sample_rate as f64).round();
            (frame as usize).min(total_frames)
        };
        let start = to_frame(self.start_time);
        let end = to_frame(self.end_time).max(start);
        (start, end)
    }
}

/// Apply trim, gain, fades and reverse, keeping rate and channel count.
pub fn apply_edits(audio: &DecodedAudio, params: &EditParams) -> DecodedAudio {
    let channels = audio.channel_count();
    let (start, end) = params.frame_range(audio.sample_rate, audio.frame_count());
    let mut samples = slice_frames(&audio.samples, channels, start, end);

    let factor = gain_factor(&samples, params);
    if factor != 1.0 {
        for sample in &mut samples {
            *sample *= factor;
        }
    }

    let frames = end - start;
    let rate = audio.sample_rate as f64;
    let fade_in_frames = ((params.fade_in.max(0.0) * rate).round() as usize).min(frames);
    let fade_out_frames = ((params.fade_out.max(0.0) * rate).round() as usize).min(frames);
    apply_fade_in(&mut samples, channels, fade_in_frames);
    apply_fade_out(&mut samples, channels, fade_out_frames);
    if params.reverse {
        reverse_frames(&mut samples, channels);
    }

    DecodedAudio {
        samples,
        sample_rate: audio.sample_rate,
        channels: audio.channels,
    }
}

fn gain_factor(samples: &[f32], params: &EditParams) -> f32 {
    if !params.normalize {
        return params.gain;
    }
    let peak = samples
        .iter()
        .map(|s| s.abs())
        .filter(|s| s.is_finite())
        .fold(0.0f32, f32::max);
    if peak > 0.0 {
        params.gain / peak
    } else {
        params.gain
    }
}

fn slice_frames(samples: &[f32], channels: usize, start_frame: usize, end_frame: usize) -> Vec<f32> {
    samples[start_frame * channels..end_frame * channels].to_vec()
}

/// Linear ramp from silence over the first `fade_frames` frames.
fn apply_fade_in(samples: &mut [f32], channels: usize, fade_frames: usize) {
    if fade_frames == 0 {
        return;
    }
    for frame in 0..fade_frames {
        let factor = frame as f32 / fade_frames as f32;
        for sample in &mut samples[frame * channels..(frame + 1) * channels] {
            *sample *= factor;
        }
    }
}

/// Linear ramp to silence over the last `fade_frames` frames.
fn apply_fade_out(samples: &mut [f32], channels: usize, fade_frames: usize) {
    let total_frames = samples.len() / channels;
    if fade_frames == 0 || total_frames == 0 {
        return;
    }
    let first = total_frames - fade_frames;
    for i in 0..fade_frames {
        let factor = (fade_frames - 1 - i) as f32 / fade_frames as f32;
        let frame = first + i;
        for sample in &mut samples[frame * channels..(frame + 1) * channels] {
            *sample *= factor;
        }
    }
}

fn reverse_frames(samples: &mut [f32], channels: usize) {
    let total_frames = samples.len() / channels;
    if total_frames < 2 {
        return;
    }
    let mut left = 0;
    let mut right = total_frames - 1;
    while left < right {
        for ch in 0..channels {
            samples.swap(left * channels + ch, right * channels + ch);
        }
        left += 1;
        right -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(frames: usize, channels: u16, sample_rate: u32) -> DecodedAudio {
        let samples = (0..frames)
            .flat_map(|frame| {
                let value = frame as f32 / frames as f32;
                std::iter::repeat_n(value, channels as usize)
            })
            .collect();
        DecodedAudio {
            samples,
            sample_rate,
            channels,
        }
    }

    #[test]
    fn trim_cuts_sample_accurate_range() {
        let audio = ramp(44_100, 1, 44_100);
        let params = EditParams {
            start_time: 0.25,
            end_time: 0.75,
            ..EditParams::full(1.0)
        };
        let edited = apply_edits(&audio, &params);
        assert_eq!(edited.frame_count(), 22_050);
        assert_eq!(edited.samples[0], audio.samples[11_025]);
    }

    #[test]
    fn range_is_clamped_to_clip() {
        let params = EditParams {
            start_time: -1.0,
            end_time: 10.0,
            ..EditParams::full(1.0)
        };
        assert_eq!(params.frame_range(100, 50), (0, 50));
        let inverted = EditParams {
            start_time: 0.5,
            end_time: 0.2,
            ..EditParams::full(1.0)
        };
        assert_eq!(inverted.frame_range(100, 100), (50, 50));
    }

    #[test]
    fn normalize_scales_before_gain() {
        let audio = DecodedAudio {
            samples: vec![0.25, -0.5, 0.1],
            sample_rate: 3,
            channels: 1,
        };
        let params = EditParams {
            gain: 0.5,
            normalize: true,
            ..EditParams::full(1.0)
        };
        let edited = apply_edits(&audio, &params);
        assert_eq!(edited.samples, vec![0.25, -0.5, 0.1]);

        let plain = EditParams {
            gain: 2.0,
            ..EditParams::full(1.0)
        };
        assert_eq!(apply_edits(&audio, &plain).samples, vec![0.5, -1.0, 0.2]);
    }

    #[test]
    fn fades_ramp_every_channel_from_and_to_zero() {
        let audio = DecodedAudio {
            samples: vec![1.0; 20],
            sample_rate: 10,
            channels: 2,
        };
        let params = EditParams {
            fade_in: 0.4,
            fade_out: 0.4,
            ..EditParams::full(1.0)
        };
        let edited = apply_edits(&audio, &params);
        assert_eq!(&edited.samples[0..2], &[0.0, 0.0]);
        assert_eq!(&edited.samples[2..4], &[0.25, 0.25]);
        assert_eq!(&edited.samples[18..20], &[0.0, 0.0]);
        assert_eq!(&edited.samples[16..18], &[0.25, 0.25]);
    }

    #[test]
    fn reverse_keeps_channels_paired() {
        let audio = DecodedAudio {
            samples: vec![1.0, -1.0, 2.0, -2.0, 3.0, -3.0],
            sample_rate: 3,
            channels: 2,
        };
        let params = EditParams {
            reverse: true,
            ..EditParams::full(1.0)
        };
        let edited = apply_edits(&audio, &params);
        assert_eq!(edited.samples, vec![3.0, -3.0, 2.0, -2.0, 1.0, -1.0]);
        assert_eq!(edited.channels, 2);
        assert_eq!(edited.sample_rate, 3);
    }
}
