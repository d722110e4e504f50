//! Decoded sample data.
//!
//! Waves are always stored at the engine width. Mono material is duplicated
//! into both channels on construction so playback never branches on width.

use crate::error::{Error, Result};
use ostinato_core::{AudioBuffer, AudioBufferView, Frame, Id, MAX_IO_CHANS};

#[derive(Debug, Clone, PartialEq)]
pub struct Wave {
    id: Id,
    name: String,
    rate: u32,
    buffer: AudioBuffer,
}

impl Wave {
    /// Builds from interleaved `channels`-wide samples (1 or 2).
    pub fn from_interleaved(id: Id, samples: Vec<f32>, channels: usize, rate: u32) -> Result<Self> {
        let buffer = match channels {
            1 => {
                let mut spread = Vec::with_capacity(samples.len() * MAX_IO_CHANS);
                for s in samples {
                    spread.extend(std::iter::repeat(s).take(MAX_IO_CHANS));
                }
                AudioBuffer::from_interleaved(spread, MAX_IO_CHANS)
            }
            MAX_IO_CHANS => AudioBuffer::from_interleaved(samples, MAX_IO_CHANS),
            other => return Err(Error::UnsupportedChannels(other)),
        };

        Ok(Self {
            id,
            name: String::new(),
            rate,
            buffer,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rate(&self) -> u32 {
        self.rate
    }

    pub fn frames(&self) -> Frame {
        self.buffer.frames()
    }

    pub fn buffer(&self) -> &AudioBuffer {
        &self.buffer
    }

    /// The first `end` frames, clamped to the wave length.
    pub fn view_until(&self, end: Frame) -> AudioBufferView<'_> {
        let end = end.min(self.frames());
        AudioBuffer::view(&self.buffer.samples()[..end * MAX_IO_CHANS], end, MAX_IO_CHANS)
    }
}
