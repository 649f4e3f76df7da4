use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analyzer::{LifestyleOverhaulPlan, ProductAnalysis};

/// Maximum number of entries kept per history list.
pub const MAX_HISTORY_ITEMS: usize = 50;

/// A past AI result together with when and why it was requested.
///
/// The result's fields are flattened next to `id`, `timestamp`, and `query`
/// so the stored shape is a single flat object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry<T> {
    #[serde(flatten)]
    pub record: T,
    pub id: String,
    /// Creation time in milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub query: String,
}

pub type ProductHistoryItem = HistoryEntry<ProductAnalysis>;
pub type OverhaulHistoryItem = HistoryEntry<LifestyleOverhaulPlan>;

/// Both history lists, newest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryData {
    pub products: Vec<ProductHistoryItem>,
    pub overhauls: Vec<OverhaulHistoryItem>,
}

impl HistoryData {
    pub fn is_empty(&self) -> bool {
        self.products.is_empty() && self.overhauls.is_empty()
    }
}

/// Wrap a fresh result with a random id and the current time.
pub fn new_entry<T>(record: T, query: String) -> HistoryEntry<T> {
    HistoryEntry {
        record,
        id: generate_entry_id(),
        timestamp: Utc::now().timestamp_millis(),
        query,
    }
}

/// Generate a random version 4 UUID.
pub fn generate_entry_id() -> String {
    Uuid::new_v4().to_string()
}

/// Put `item` at the front of `list` and drop everything past the cap.
pub(crate) fn prepend_capped<T>(list: &mut Vec<T>, item: T) {
    list.insert(0, item);
    list.truncate(MAX_HISTORY_ITEMS);
}
