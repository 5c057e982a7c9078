use std::fs::File;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use symphonia::core::{
    audio::SampleBuffer,
    codecs::DecoderOptions,
    errors::Error,
    formats::FormatOptions,
    io::{MediaSource, MediaSourceStream},
    meta::MetadataOptions,
    probe::Hint,
};
use thiserror::Error;

use super::DecodedAudio;

/// Errors raised while turning a file into PCM.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Unsupported or corrupt audio in {name}: {message}")]
    Unsupported { name: String, message: String },
    #[error("No default track in {0}")]
    NoTrack(String),
    #[error("Missing {field} for {name}")]
    MissingParam { name: String, field: &'static str },
    #[error("Decode failed for {name}: {message}")]
    Codec { name: String, message: String },
    #[error("Decoded 0 samples from {0}")]
    Empty(String),
}

/// Decode a file on disk into interleaved `f32` samples.
pub fn decode_file(path: &Path) -> Result<DecodedAudio, DecodeError> {
    let file = File::open(path).map_err(|source| DecodeError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let extension = path.extension().and_then(|ext| ext.to_str());
    decode_source(Box::new(file), extension, &path.display().to_string())
}

/// Stream facts read from container headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamInfo {
    pub sample_rate: u32,
    pub channels: u16,
    pub frames: u64,
}

impl StreamInfo {
    pub fn duration_seconds(&self) -> f64 {
        self.frames as f64 / self.sample_rate.max(1) as f64
    }
}

/// Read sample rate, channel count and length without decoding, falling back
/// to a full decode when the container does not record a frame count.
pub fn probe_file(path: &Path) -> Result<StreamInfo, DecodeError> {
    let name = path.display().to_string();
    let file = File::open(path).map_err(|source| DecodeError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());
    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(ext);
    }
    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|err| DecodeError::Unsupported {
            name: name.clone(),
            message: err.to_string(),
        })?;
    let track = probed
        .format
        .default_track()
        .ok_or_else(|| DecodeError::NoTrack(name.clone()))?;
    let params = &track.codec_params;
    if let (Some(sample_rate), Some(channels), Some(frames)) =
        (params.sample_rate, params.channels, params.n_frames)
    {
        return Ok(StreamInfo {
            sample_rate: sample_rate.max(1),
            channels: (channels.count() as u16).max(1),
            frames,
        });
    }
    let decoded = decode_file(path)?;
    Ok(StreamInfo {
        sample_rate: decoded.sample_rate,
        channels: decoded.channels,
        frames: decoded.frame_count() as u64,
    })
}

/// Decode an in-memory file, using `name` for the format hint and error messages.
pub fn decode_bytes(bytes: Vec<u8>, name: &str) -> Result<DecodedAudio, DecodeError> {
    let extension = Path::new(name).extension().and_then(|ext| ext.to_str());
    decode_source(Box::new(Cursor::new(bytes)), extension, name)
}

fn decode_source(
    source: Box<dyn MediaSource>,
    extension: Option<&str>,
    name: &str,
) -> Result<DecodedAudio, DecodeError> {
    let mss = MediaSourceStream::new(source, Default::default());
    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|err| DecodeError::Unsupported {
            name: name.to_string(),
            message: err.to_string(),
        })?;
    let mut format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| DecodeError::NoTrack(name.to_string()))?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();
    let sample_rate = codec_params
        .sample_rate
        .ok_or_else(|| DecodeError::MissingParam {
            name: name.to_string(),
            field: "sample rate",
        })?;
    let mut channels = codec_params.channels.map(|layout| layout.count() as u16);

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|err| DecodeError::Unsupported {
            name: name.to_string(),
            message: err.to_string(),
        })?;

    let mut samples = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(Error::IoError(_)) => break,
            Err(Error::ResetRequired) => break,
            Err(err) => {
                return Err(DecodeError::Codec {
                    name: name.to_string(),
                    message: err.to_string(),
                });
            }
        };
        if packet.track_id() != track_id {
            continue;
        }
        let audio_buf = match decoder.decode(&packet) {
            Ok(audio_buf) => audio_buf,
            Err(Error::DecodeError(_)) => continue,
            Err(err) => {
                return Err(DecodeError::Codec {
                    name: name.to_string(),
                    message: err.to_string(),
                });
            }
        };
        let spec = *audio_buf.spec();
        channels.get_or_insert(spec.channels.count() as u16);
        let mut sample_buf = SampleBuffer::<f32>::new(audio_buf.capacity() as u64, spec);
        sample_buf.copy_interleaved_ref(audio_buf);
        samples.extend_from_slice(sample_buf.samples());
    }

    let channels = channels.ok_or_else(|| DecodeError::MissingParam {
        name: name.to_string(),
        field: "channel count",
    })?;
    if samples.is_empty() {
        return Err(DecodeError::Empty(name.to_string()));
    }
    Ok(DecodedAudio {
        samples,
        sample_rate: sample_rate.max(1),
        channels: channels.max(1),
    })
}
