//! # Ostinato Actions
//!
//! Frame-indexed ledger of recorded channel events ("actions").
//!
//! - [`Action`] - one timestamped event, linked to its paired half by id
//! - [`Ledger`] - frame → actions map plus id-based queries
//! - [`ActionRecorder`] - the editing surface (record, update, delete, clone,
//!   live capture, consolidation, key-frame rewrites)
//! - [`persist`] - flat records for patch files
//!
//! Edits go through a [`LedgerHost`], which owns the ledger inside the back
//! document and publishes it with a structural swap after every change.

mod action;
pub mod error;
mod ledger;
pub mod persist;
mod recorder;

pub use action::Action;
pub use error::{Error, Result};
pub use ledger::Ledger;
pub use persist::PersistedAction;
pub use recorder::{ActionRecorder, LedgerHost, LIVE_CHUNK, MIN_ACTION_SPAN};
