//! # Ostinato - Loop Workstation Core
//!
//! Real-time core of a loop-based audio workstation.
//!
//! ## Architecture
//!
//! Ostinato is an umbrella crate that coordinates:
//! - **ostinato-core** - buffers, resampler, document swap ring, shared store, sequencer
//! - **ostinato-actions** - the action ledger and its editing surface
//! - **ostinato-sampler** - sample channels and their playback state machine
//!
//! The control side edits a [`Document`] through the [`Model`]; the audio
//! thread renders it through the [`Engine`]. The two never share a lock: the
//! document travels through a ring of snapshots, heavyweight objects through
//! gated stores, and live key events through a lock-free queue.
//!
//! ## Quick Start
//!
//! ```ignore
//! use ostinato::prelude::*;
//!
//! let (mut model, mut engine) = Model::new(EngineConfig::default());
//! let ch = model.add_channel(SamplePlayerMode::SingleBasic)?;
//! model.load_wave(ch, samples, 1, 44_100)?;
//! model.press(ch, MAX_VELOCITY)?;
//!
//! // Audio callback
//! engine.process(&input, &mut output, frames)?;
//! ```

/// Re-export of ostinato-core for direct access
pub use ostinato_core as core;
pub use ostinato_actions as actions;
pub use ostinato_sampler as sampler;

mod config;
mod document;
mod engine;
mod error;
mod model;
mod queue;

pub use config::EngineConfig;
pub use document::{Document, MixerState};
pub use engine::Engine;
pub use error::{Error, Result};
pub use model::Model;
pub use queue::{command_queue, Command, CommandConsumer, CommandProducer};

pub mod prelude {
    pub use crate::{Document, Engine, EngineConfig, Error, MixerState, Model, Result};
    pub use ostinato_actions::{Action, Ledger, PersistedAction};
    pub use ostinato_core::{
        AudioBuffer, Behaviors, EventType, Frame, Id, MidiEvent, Pan, ResamplerQuality,
        SequencerStatus, SwapHint, MAX_VELOCITY,
    };
    pub use ostinato_sampler::{Channel, ChannelMonitor, ChannelStatus, SamplePlayerMode};
}
