//! User-facing flows behind the `nutrilife` binary.
//!
//! Each function validates its input, performs one operation, and returns
//! a serializable outcome; errors come back as display-ready strings.

pub mod analyzer;
pub mod auth;
pub mod config;
pub mod history;
pub mod keychain;
pub mod overhaul;
pub mod recommend;
pub mod render;

use crate::app::App;
use crate::history::{HistoryError, WriteAccess};

/// Apply any session change, then ask for write access as the current
/// session.
pub(crate) async fn history_access(app: &mut App) -> Result<Option<WriteAccess>, HistoryError> {
    app.sync_history().await?;
    Ok(app.history().write_access(app.session().as_ref()))
}
