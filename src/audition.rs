//! Exclusive audition of one sample at a time.

use thiserror::Error;
use tracing::debug;

use crate::audio::DecodedAudio;
use crate::catalog::SampleId;

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("Audio output unavailable: {0}")]
    Output(String),
    #[error("Nothing to play")]
    Empty,
}

/// A started playback that can be stopped.
pub trait PlaybackHandle {
    fn stop(&mut self);
    fn is_playing(&self) -> bool;
}

/// Audio output that can start a clip.
pub trait PlaybackSink {
    fn start(&mut self, clip: &DecodedAudio) -> Result<Box<dyn PlaybackHandle>, PlaybackError>;
}

/// Plays at most one clip; starting another stops and drops the previous one first.
pub struct Audition {
    sink: Box<dyn PlaybackSink>,
    active: Option<(SampleId, Box<dyn PlaybackHandle>)>,
}

impl Audition {
    pub fn new(sink: impl PlaybackSink + 'static) -> Self {
        Self {
            sink: Box::new(sink),
            active: None,
        }
    }

    /// Audition without an audio device.
    pub fn silent() -> Self {
        Self::new(SilentSink)
    }

    /// Rodio output on the default device, falling back to silence when none opens.
    #[cfg(feature = "playback")]
    pub fn default_output() -> Self {
        match RodioSink::open_default() {
            Ok(sink) => Self::new(sink),
            Err(err) => {
                tracing::warn!(error = %err, "Falling back to silent audition");
                Self::silent()
            }
        }
    }

    pub fn play(&mut self, id: SampleId, clip: &DecodedAudio) -> Result<(), PlaybackError> {
        self.stop();
        if clip.samples.is_empty() {
            return Err(PlaybackError::Empty);
        }
        let handle = self.sink.start(clip)?;
        debug!(sample = %id, "Audition started");
        self.active = Some((id, handle));
        Ok(())
    }

    pub fn stop(&mut self) {
        if let Some((id, mut handle)) = self.active.take() {
            handle.stop();
            debug!(sample = %id, "Audition stopped");
        }
    }

    /// Sample currently auditioned, if it is still playing.
    pub fn current(&self) -> Option<&SampleId> {
        self.active
            .as_ref()
            .filter(|(_, handle)| handle.is_playing())
            .map(|(id, _)| id)
    }
}

impl Drop for Audition {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Sink that plays nothing; handles report playing until stopped.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentSink;

struct SilentHandle {
    playing: bool,
}

impl PlaybackHandle for SilentHandle {
    fn stop(&mut self) {
        self.playing = false;
    }

    fn is_playing(&self) -> bool {
        self.playing
    }
}

impl PlaybackSink for SilentSink {
    fn start(&mut self, _clip: &DecodedAudio) -> Result<Box<dyn PlaybackHandle>, PlaybackError> {
        Ok(Box::new(SilentHandle { playing: true }))
    }
}

#[cfg(feature = "playback")]
pub use rodio_output::RodioSink;

#[cfg(feature = "playback")]
mod rodio_output {
    use rodio::{OutputStream, Sink, buffer::SamplesBuffer};

    use super::{PlaybackError, PlaybackHandle, PlaybackSink};
    use crate::audio::DecodedAudio;

    /// Default-device output through rodio.
    pub struct RodioSink {
        stream: OutputStream,
    }

    impl RodioSink {
        pub fn open_default() -> Result<Self, PlaybackError> {
            let stream = rodio::OutputStreamBuilder::open_default_stream()
                .map_err(|err| PlaybackError::Output(err.to_string()))?;
            Ok(Self { stream })
        }
    }

    struct RodioHandle {
        sink: Sink,
    }

    impl PlaybackHandle for RodioHandle {
        fn stop(&mut self) {
            self.sink.stop();
        }

        fn is_playing(&self) -> bool {
            !self.sink.empty()
        }
    }

    impl PlaybackSink for RodioSink {
        fn start(
            &mut self,
            clip: &DecodedAudio,
        ) -> Result<Box<dyn PlaybackHandle>, PlaybackError> {
            let sink = Sink::connect_new(self.stream.mixer());
            sink.append(SamplesBuffer::new(
                clip.channels.max(1),
                clip.sample_rate.max(1),
                clip.samples.clone(),
            ));
            sink.play();
            Ok(Box::new(RodioHandle { sink }))
        }
    }
}
