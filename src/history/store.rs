use std::sync::Arc;

use tracing::{error, info, warn};

use super::local::LocalSlot;
use super::replicator::Replicator;
use super::types::{prepend_capped, HistoryData, OverhaulHistoryItem, ProductHistoryItem};
use super::HistoryError;
use crate::auth::Session;
use crate::documents::UserDocuments;

/// Whose history the store currently holds.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Owner {
    /// No session; history kept in the local slot.
    Anonymous,
    /// No session and local history disabled; nothing is recorded.
    SignedOut,
    /// Signed in; history replicated to the user's remote document.
    User(String),
}

/// Permission to mutate the history of the owner it was issued for.
///
/// Obtained from [`HistoryStore::write_access`]. Access issued before an
/// owner change is stale and every mutation presented with it is ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteAccess {
    generation: u64,
}

/// In-memory history for the current owner plus its persistence.
pub struct HistoryStore {
    local: LocalSlot,
    documents: Arc<dyn UserDocuments>,
    replicator: Replicator,
    local_when_signed_out: bool,
    owner: Owner,
    session: Option<Session>,
    data: HistoryData,
    /// Bumped on every owner change to invalidate outstanding access.
    generation: u64,
    writable: bool,
}

impl HistoryStore {
    /// Open the store in the signed-out state, loading the local slot when
    /// local history is enabled. Must be called inside a tokio runtime.
    pub async fn open(
        local: LocalSlot,
        documents: Arc<dyn UserDocuments>,
        local_when_signed_out: bool,
    ) -> Self {
        let replicator = Replicator::spawn(documents.clone());
        let mut store = Self {
            local,
            documents,
            replicator,
            local_when_signed_out,
            owner: Owner::SignedOut,
            session: None,
            data: HistoryData::default(),
            generation: 0,
            writable: false,
        };
        store.enter_signed_out().await;
        store
    }

    pub fn history(&self) -> &HistoryData {
        &self.data
    }

    /// Whether anything will be recorded for the current owner.
    pub fn is_enabled(&self) -> bool {
        self.writable
    }

    pub fn is_signed_in(&self) -> bool {
        matches!(self.owner, Owner::User(_))
    }

    /// Follow a change of the current session.
    ///
    /// Signing in fetches the user's remote document once; a fetch failure
    /// is returned and leaves the store without write access for that user.
    /// Signing out resets history to empty and never touches the remote
    /// copy.
    pub async fn activate(&mut self, session: Option<&Session>) -> Result<(), HistoryError> {
        match session {
            Some(session) => self.enter_user(session).await,
            None => {
                if self.session.is_some() || self.owner == Owner::SignedOut {
                    self.enter_signed_out().await;
                }
                Ok(())
            }
        }
    }

    async fn enter_user(&mut self, session: &Session) -> Result<(), HistoryError> {
        if self.owner == Owner::User(session.uid().to_string()) && self.writable {
            // Same user with refreshed tokens.
            self.session = Some(session.clone());
            return Ok(());
        }

        self.begin_owner(Owner::User(session.uid().to_string()));
        self.session = Some(session.clone());

        match self.documents.fetch(session).await {
            Ok(Some(doc)) => {
                info!(
                    "Loaded remote history for {}: {} products, {} overhauls",
                    session.uid(),
                    doc.history.products.len(),
                    doc.history.overhauls.len()
                );
                self.data = doc.history;
            }
            Ok(None) => info!("No remote history for {}", session.uid()),
            Err(e) => {
                error!("Error fetching history for {}: {}", session.uid(), e);
                return Err(e.into());
            }
        }
        self.writable = true;
        Ok(())
    }

    async fn enter_signed_out(&mut self) {
        if !self.local_when_signed_out {
            self.begin_owner(Owner::SignedOut);
            return;
        }

        self.begin_owner(Owner::Anonymous);
        let slot = self.local.clone();
        self.data = match tokio::task::spawn_blocking(move || slot.load()).await {
            Ok(history) => history,
            Err(e) => {
                error!("Local history task panicked: {}", e);
                HistoryData::default()
            }
        };
        self.writable = true;
    }

    fn begin_owner(&mut self, owner: Owner) {
        info!("History owner changed: {:?} -> {:?}", self.owner, owner);
        self.owner = owner;
        self.session = None;
        self.data = HistoryData::default();
        self.generation += 1;
        self.writable = false;
    }

    /// Issue write access when `session` matches the current owner.
    pub fn write_access(&self, session: Option<&Session>) -> Option<WriteAccess> {
        if !self.writable {
            return None;
        }
        let matches = match (&self.owner, session) {
            (Owner::Anonymous, None) => true,
            (Owner::User(uid), Some(session)) => uid == session.uid(),
            _ => false,
        };
        matches.then_some(WriteAccess {
            generation: self.generation,
        })
    }

    fn check(&self, access: &WriteAccess) -> bool {
        if self.writable && access.generation == self.generation {
            return true;
        }
        warn!("Ignoring history write with stale access");
        false
    }

    /// Record a product analysis as the newest entry. Returns whether it was
    /// recorded.
    pub async fn add_product(&mut self, access: &WriteAccess, item: ProductHistoryItem) -> bool {
        if !self.check(access) {
            return false;
        }
        prepend_capped(&mut self.data.products, item);
        self.persist().await;
        true
    }

    /// Record an overhaul plan as the newest entry. Returns whether it was
    /// recorded.
    pub async fn add_overhaul(&mut self, access: &WriteAccess, item: OverhaulHistoryItem) -> bool {
        if !self.check(access) {
            return false;
        }
        prepend_capped(&mut self.data.overhauls, item);
        self.persist().await;
        true
    }

    /// Remove every entry. Returns whether the history was cleared.
    pub async fn clear(&mut self, access: &WriteAccess) -> bool {
        if !self.check(access) {
            return false;
        }
        self.data = HistoryData::default();
        self.persist().await;
        true
    }

    /// Wait for queued remote writes to be attempted.
    pub async fn flush(&self) {
        self.replicator.flush().await;
    }

    async fn persist(&self) {
        match (&self.owner, &self.session) {
            (Owner::User(_), Some(session)) => {
                self.replicator.replicate(session.clone(), self.data.clone());
            }
            (Owner::Anonymous, _) => {
                let slot = self.local.clone();
                let data = self.data.clone();
                let result = tokio::task::spawn_blocking(move || slot.save(&data))
                    .await
                    .map_err(|e| HistoryError::Local(format!("Local save task panicked: {}", e)))
                    .and_then(|r| r);
                if let Err(e) = result {
                    error!("Error saving local history: {}", e);
                }
            }
            _ => {}
        }
    }
}
