//! Remote per-user documents holding account metadata and history.

pub mod firestore;
pub mod value;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::Session;
use crate::history::HistoryData;

pub use firestore::FirestoreDocuments;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Remote store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Remote store error: {status} - {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Malformed remote document: {0}")]
    Malformed(String),

    #[error("Invalid remote store configuration: {0}")]
    Config(String),
}

/// The document stored for each user, addressed by uid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDocument {
    pub email: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub history: HistoryData,
}

impl UserDocument {
    /// A brand-new account record with empty history.
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            created_at: Utc::now(),
            history: HistoryData::default(),
        }
    }
}

/// Remote storage of user documents.
#[async_trait]
pub trait UserDocuments: Send + Sync {
    /// Fetch the whole document; `None` when it does not exist.
    async fn fetch(&self, session: &Session) -> Result<Option<UserDocument>, RemoteError>;

    /// Write the whole document, replacing anything already there.
    async fn create(&self, session: &Session, doc: &UserDocument) -> Result<(), RemoteError>;

    /// Replace only the `history` field, leaving other fields untouched.
    async fn replace_history(
        &self,
        session: &Session,
        history: &HistoryData,
    ) -> Result<(), RemoteError>;
}

/// Stand-in used when no remote store is configured; every call fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unconfigured;

impl Unconfigured {
    fn error() -> RemoteError {
        RemoteError::Config("Sign-in is not configured".to_string())
    }
}

#[async_trait]
impl UserDocuments for Unconfigured {
    async fn fetch(&self, _: &Session) -> Result<Option<UserDocument>, RemoteError> {
        Err(Self::error())
    }

    async fn create(&self, _: &Session, _: &UserDocument) -> Result<(), RemoteError> {
        Err(Self::error())
    }

    async fn replace_history(&self, _: &Session, _: &HistoryData) -> Result<(), RemoteError> {
        Err(Self::error())
    }
}
