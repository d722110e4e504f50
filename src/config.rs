//! Engine construction parameters.

use ostinato_core::{Behaviors, Frame, MAX_IO_CHANS};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Device sample rate (default: 44100)
    pub sample_rate: u32,
    /// Largest block the device delivers, in frames (default: 512)
    pub buffer_size: Frame,
    /// Interleaved output width (default: 2)
    pub output_channels: usize,
    pub behaviors: Behaviors,
    /// Pending key events the audio thread can be behind by (default: 256)
    pub live_queue_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            buffer_size: 512,
            output_channels: MAX_IO_CHANS,
            behaviors: Behaviors::default(),
            live_queue_capacity: 256,
        }
    }
}

impl EngineConfig {
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_buffer_size(mut self, frames: Frame) -> Self {
        self.buffer_size = frames.max(1);
        self
    }

    /// Clamped to 1..=2.
    pub fn with_output_channels(mut self, channels: usize) -> Self {
        self.output_channels = channels.clamp(1, MAX_IO_CHANS);
        self
    }

    pub fn with_behaviors(mut self, behaviors: Behaviors) -> Self {
        self.behaviors = behaviors;
        self
    }

    pub fn with_live_queue_capacity(mut self, capacity: usize) -> Self {
        self.live_queue_capacity = capacity.max(1);
        self
    }
}
