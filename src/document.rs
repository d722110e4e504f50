//! The document every ring slot holds.
//!
//! Everything the audio thread reads without a store lock lives here: the
//! sequencer settings, mixer switches, channel metadata and the action ledger.
//! The writer clones it into recycled slots, so it holds no heavyweight data.

use ostinato_actions::Ledger;
use ostinato_core::{Behaviors, Id, SequencerState};
use ostinato_sampler::Channel;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MixerState {
    /// Default: 1.0
    pub output_gain: f32,
    /// Some channel is soloed.
    pub has_solos: bool,
    /// When false the engine outputs silence without touching channels.
    /// Default: true
    pub rendering: bool,
}

impl Default for MixerState {
    fn default() -> Self {
        Self {
            output_gain: 1.0,
            has_solos: false,
            rendering: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub sequencer: SequencerState,
    pub mixer: MixerState,
    pub behaviors: Behaviors,
    pub channels: Vec<Channel>,
    pub actions: Ledger,
}

impl Document {
    pub fn channel(&self, id: Id) -> Option<&Channel> {
        self.channels.iter().find(|c| c.id == id)
    }

    pub fn channel_mut(&mut self, id: Id) -> Option<&mut Channel> {
        self.channels.iter_mut().find(|c| c.id == id)
    }

    /// Recomputes `mixer.has_solos` from the channels.
    pub fn refresh_solos(&mut self) {
        self.mixer.has_solos = self.channels.iter().any(|c| c.solo);
    }
}
