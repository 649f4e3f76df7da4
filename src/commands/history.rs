use serde::Serialize;
use tracing::info;

use super::history_access;
use crate::app::App;
use crate::history::{HistoryData, OverhaulHistoryItem, ProductHistoryItem};

pub const HISTORY_UNAVAILABLE: &str =
    "History is off while signed out. Sign in or enable history.local_when_signed_out.";

/// Which history list to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryKind {
    Products,
    Overhauls,
}

/// One entry of either history list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ActivityItem {
    Product(ProductHistoryItem),
    Overhaul(OverhaulHistoryItem),
}

impl ActivityItem {
    pub fn timestamp(&self) -> i64 {
        match self {
            ActivityItem::Product(item) => item.timestamp,
            ActivityItem::Overhaul(item) => item.timestamp,
        }
    }
}

/// Entries of the requested kind, newest first; both kinds merged by
/// timestamp when `kind` is `None`.
pub fn activity(
    history: &HistoryData,
    kind: Option<HistoryKind>,
    limit: Option<usize>,
) -> Vec<ActivityItem> {
    let products = history.products.iter().cloned().map(ActivityItem::Product);
    let overhauls = history.overhauls.iter().cloned().map(ActivityItem::Overhaul);

    let mut items: Vec<ActivityItem> = match kind {
        Some(HistoryKind::Products) => products.collect(),
        Some(HistoryKind::Overhauls) => overhauls.collect(),
        None => products.chain(overhauls).collect(),
    };
    items.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));
    if let Some(limit) = limit {
        items.truncate(limit);
    }
    items
}

pub async fn list(
    app: &mut App,
    kind: Option<HistoryKind>,
    limit: Option<usize>,
) -> Result<Vec<ActivityItem>, String> {
    app.sync_history().await?;
    Ok(activity(app.history().history(), kind, limit))
}

/// Remove every entry of the current owner's history.
pub async fn clear(app: &mut App) -> Result<(), String> {
    let access = history_access(app)
        .await?
        .ok_or_else(|| HISTORY_UNAVAILABLE.to_string())?;
    app.history_mut().clear(&access).await;
    info!("History cleared");
    Ok(())
}
