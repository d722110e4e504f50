//! Error types for ostinato-sampler.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unsupported wave channel count: {0}")]
    UnsupportedChannels(usize),

    #[error(transparent)]
    Core(#[from] ostinato_core::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
