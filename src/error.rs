//! Centralized error type for the ostinato umbrella crate.
//!
//! Wraps all subsystem errors so `?` propagates naturally across crate boundaries.

use ostinato_core::Id;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] ostinato_core::Error),

    #[error(transparent)]
    Actions(#[from] ostinato_actions::Error),

    #[error(transparent)]
    Sampler(#[from] ostinato_sampler::Error),

    #[error("Channel {0} not found")]
    ChannelNotFound(Id),

    #[error("Command queue full")]
    QueueFull,
}

pub type Result<T> = std::result::Result<T, Error>;
