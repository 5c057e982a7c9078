//! Decoding and encoding helpers shared by the scanner, analyzer and exporter.

mod decode;
mod wav;

pub use decode::{DecodeError, StreamInfo, decode_bytes, decode_file, probe_file};
pub use wav::{EncodeError, encode_wav_16};

/// Raw decoded audio in interleaved `f32` samples.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl DecodedAudio {
    /// Effective channel count (minimum 1).
    pub fn channel_count(&self) -> usize {
        self.channels.max(1) as usize
    }

    /// Number of frames (samples per channel).
    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.channel_count()
    }

    /// Duration in seconds.
    pub fn duration_seconds(&self) -> f64 {
        self.frame_count() as f64 / self.sample_rate.max(1) as f64
    }

    /// Samples of a single channel, de-interleaved.
    pub fn channel(&self, index: usize) -> Vec<f32> {
        let channels = self.channel_count();
        let index = index.min(channels - 1);
        self.samples
            .iter()
            .skip(index)
            .step_by(channels)
            .copied()
            .collect()
    }
}
