//! Error types for ostinato-actions.

use ostinato_core::Id;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("Persisted action has id 0")]
    ZeroId,

    #[error("Duplicate action id {0}")]
    DuplicateId(Id),
}

pub type Result<T> = std::result::Result<T, Error>;
