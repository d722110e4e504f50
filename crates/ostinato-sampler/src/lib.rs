//! # Ostinato Sampler
//!
//! Sample channels and their playback state machine.
//!
//! - [`Channel`] - document-side channel description (volume, pan, player)
//! - [`ChannelRuntime`] - audio-thread state: status, cursor, quantizer, buffer
//! - [`SampleController`] - routes block events through [`fsm::transition`]
//!   and renders the wave
//! - [`Wave`] - decoded stereo sample data
//!
//! A block for one channel runs `begin_block`, `advance`, any number of
//! `parse` calls in delta order, then `render`.

mod channel;
mod controller;
pub mod error;
pub mod fsm;
mod player;
mod render;
mod runtime;
mod status;
mod wave;

#[cfg(test)]
mod testing;

pub use channel::{Channel, ChannelEvent};
pub use controller::SampleController;
pub use error::{Error, Result};
pub use player::SamplePlayer;
pub use runtime::{ChannelMonitor, ChannelRuntime, QuantizedAction};
pub use status::{AtomicStatus, ChannelStatus, SamplePlayerMode};
pub use wave::Wave;
