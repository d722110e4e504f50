//! # Ostinato Core
//!
//! Real-time primitives shared by every ostinato subsystem.
//!
//! - [`AudioBuffer`] - fixed-channel interleaved sample storage and mixing
//! - [`Resampler`] - pull-based sample-rate conversion on top of rubato
//! - [`IdManager`] - monotonic id generator
//! - [`swap`] - lock-free ring of document snapshots for the audio thread
//! - [`store`] - id-addressed store for heavyweight objects shared with the audio thread
//! - [`transport`] - sequencer, per-block event bundle and quantizer
//!
//! Nothing in this crate allocates, blocks or logs on the audio-thread paths
//! (`SwapReader::lock`, `StoreReader::get`, `Sequencer::advance`, buffer mixing).

pub mod buffer;
pub mod config;
pub mod error;
pub mod id;
pub mod lockfree;
pub mod midi;
pub mod resampler;
pub mod store;
pub mod swap;
pub mod transport;

pub use buffer::{AudioBuffer, AudioBufferView, AudioBufferViewMut, Pan};
pub use config::Behaviors;
pub use error::{Error, Result};
pub use id::IdManager;
pub use lockfree::{AtomicFlag, AtomicFloat, AtomicFrame};
pub use midi::{EventType, MidiEvent};
pub use resampler::{Conversion, Resampler, ResamplerQuality};
pub use store::{DataLock, SharedStore, StoreReader};
pub use swap::{ring, RtLock, SwapHint, SwapReader, SwapWriter};
pub use transport::{
    quantize_frame, Quantizer, Sequencer, SequencerEvent, SequencerEventKind, SequencerState,
    SequencerStatus, Transport,
};

/// One sample-period index along the transport timeline.
pub type Frame = usize;

/// Stable identifier for channels, actions, waves. Zero means "none".
pub type Id = u32;

/// Maximum number of interleaved channels handled by the engine.
pub const MAX_IO_CHANS: usize = 2;

/// Maximum MIDI velocity.
pub const MAX_VELOCITY: u8 = 127;

/// Maximum channel volume.
pub const MAX_VOLUME: f32 = 1.0;

pub const MIN_PITCH: f32 = 0.1;
pub const MAX_PITCH: f32 = 4.0;
