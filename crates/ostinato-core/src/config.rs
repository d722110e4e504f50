//! Playback behaviour switches shared by the channel state machine and engine.

use crate::resampler::ResamplerQuality;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Behaviors {
    /// Kill playing loops and action-driven channels when the sequencer stops.
    /// Default: true
    pub chans_stop_on_seq_halt: bool,

    /// Defer read-actions toggles to the next first beat, like loops.
    /// Default: false
    pub treat_recs_as_loops: bool,

    /// Quality for pitched playback.
    /// Default: Linear
    pub resampler_quality: ResamplerQuality,
}

impl Default for Behaviors {
    fn default() -> Self {
        Self {
            chans_stop_on_seq_halt: true,
            treat_recs_as_loops: false,
            resampler_quality: ResamplerQuality::Linear,
        }
    }
}

impl Behaviors {
    pub fn with_chans_stop_on_seq_halt(mut self, enabled: bool) -> Self {
        self.chans_stop_on_seq_halt = enabled;
        self
    }

    pub fn with_treat_recs_as_loops(mut self, enabled: bool) -> Self {
        self.treat_recs_as_loops = enabled;
        self
    }

    pub fn with_resampler_quality(mut self, quality: ResamplerQuality) -> Self {
        self.resampler_quality = quality;
        self
    }
}
