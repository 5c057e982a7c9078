use std::io::Cursor;

use thiserror::Error;

use super::DecodedAudio;

/// Errors raised while writing a WAV container.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("Failed to write wav: {0}")]
    Wav(#[from] hound::Error),
    #[error("Cannot encode a clip with 0 frames")]
    Empty,
    #[error("Clip is too large for a RIFF container")]
    TooLarge,
}

const PCM_FORMAT_TAG: u16 = 1;
const PCM_HEADER_LEN: usize = 44;

/// Encode interleaved samples as little-endian 16-bit PCM WAV bytes.
///
/// Every channel count gets the canonical 44-byte header with a plain PCM
/// fmt chunk. hound switches to WAVE_FORMAT_EXTENSIBLE above two channels, so
/// those clips get a hand-written header.
pub fn encode_wav_16(audio: &DecodedAudio) -> Result<Vec<u8>, EncodeError> {
    if audio.frame_count() == 0 {
        return Err(EncodeError::Empty);
    }
    let channels = audio.channels.max(1);
    if channels > 2 {
        return encode_plain_pcm16(audio, channels);
    }
    let spec = hound::WavSpec {
        channels,
        sample_rate: audio.sample_rate.max(1),
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::with_capacity(PCM_HEADER_LEN + audio.samples.len() * 2));
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        let mut pcm = writer.get_i16_writer(audio.samples.len() as u32);
        for &sample in &audio.samples {
            pcm.write_sample(to_i16(sample));
        }
        pcm.flush()?;
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

fn encode_plain_pcm16(audio: &DecodedAudio, channels: u16) -> Result<Vec<u8>, EncodeError> {
    let sample_rate = audio.sample_rate.max(1);
    let samples = &audio.samples[..audio.frame_count() * usize::from(channels)];
    let block_align = channels.checked_mul(2).ok_or(EncodeError::TooLarge)?;
    let byte_rate = sample_rate
        .checked_mul(u32::from(block_align))
        .ok_or(EncodeError::TooLarge)?;
    let data_len = u32::try_from(samples.len() * 2).map_err(|_| EncodeError::TooLarge)?;
    let riff_len = data_len.checked_add(36).ok_or(EncodeError::TooLarge)?;

    let mut out = Vec::with_capacity(PCM_HEADER_LEN + samples.len() * 2);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&riff_len.to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&PCM_FORMAT_TAG.to_le_bytes());
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&16u16.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    for &sample in samples {
        out.extend_from_slice(&to_i16(sample).to_le_bytes());
    }
    Ok(out)
}

fn to_i16(sample: f32) -> i16 {
    let clamped = if sample.is_finite() {
        sample.clamp(-1.0, 1.0)
    } else {
        0.0
    };
    (clamped * i16::MAX as f32).round() as i16
}
