//! Capped history of past analyses and overhaul plans.
//!
//! Anonymous history lives in a local SQLite key-value slot; a signed-in
//! user's history is replicated to their remote document.

pub mod local;
pub mod replicator;
pub mod store;
pub mod types;

use thiserror::Error;

use crate::documents::RemoteError;

pub use local::LocalSlot;
pub use replicator::Replicator;
pub use store::{HistoryStore, WriteAccess};
pub use types::{
    generate_entry_id, new_entry, HistoryData, HistoryEntry, OverhaulHistoryItem,
    ProductHistoryItem, MAX_HISTORY_ITEMS,
};

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Local history error: {0}")]
    Local(String),

    #[error("Could not load your history: {0}")]
    Remote(#[from] RemoteError),
}

impl From<HistoryError> for String {
    fn from(err: HistoryError) -> String {
        err.to_string()
    }
}
