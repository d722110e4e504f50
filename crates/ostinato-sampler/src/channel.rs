//! Channel metadata and the events a channel reacts to.

use crate::player::SamplePlayer;
use ostinato_core::{Id, MidiEvent, Pan, MAX_VOLUME};
use serde::{Deserialize, Serialize};

/// Document-side description of one sample channel. Everything the audio
/// thread mutates lives in [`ChannelRuntime`](crate::ChannelRuntime) instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Channel {
    pub id: Id,
    pub name: String,
    /// Default: 1.0
    pub volume: f32,
    /// Knob position, 0.5 is center.
    /// Default: 0.5
    pub pan: f32,
    pub mute: bool,
    pub solo: bool,
    pub armed: bool,
    pub has_actions: bool,
    pub player: SamplePlayer,
}

impl Default for Channel {
    fn default() -> Self {
        Self {
            id: 0,
            name: String::new(),
            volume: MAX_VOLUME,
            pan: 0.5,
            mute: false,
            solo: false,
            armed: false,
            has_actions: false,
            player: SamplePlayer::default(),
        }
    }
}

impl Channel {
    pub fn new(id: Id) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    pub fn pan_gains(&self) -> Pan {
        Pan::from_position(self.pan)
    }

    /// Audible given the mixer's solo state.
    pub fn is_audible(&self, has_solos: bool) -> bool {
        !self.mute && (!has_solos || self.solo)
    }
}

/// One event routed to a channel within a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelEvent {
    /// `recording` is set when the control side captured this press.
    KeyPress { velocity: u8, recording: bool },
    KeyRelease { recording: bool },
    KeyKill,
    FirstBeat,
    Bar,
    SeqStop,
    /// Replayed ledger action.
    Action(MidiEvent),
    ToggleReadActions,
    KillReadActions,
}
