use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use super::types::HistoryData;
use crate::auth::Session;
use crate::documents::UserDocuments;

enum Job {
    Replace {
        session: Session,
        history: HistoryData,
    },
    Flush(oneshot::Sender<()>),
}

/// One-way replication of history snapshots to the remote document.
///
/// A single worker drains jobs in order, so the last snapshot queued is the
/// last one written. Each job is attempted once; failures are logged and
/// dropped.
pub struct Replicator {
    tx: mpsc::UnboundedSender<Job>,
}

impl Replicator {
    /// Start the worker on the current tokio runtime.
    pub fn spawn(documents: Arc<dyn UserDocuments>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();

        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                match job {
                    Job::Replace { session, history } => {
                        debug!("Replicating history for {}", session.uid());
                        if let Err(e) = documents.replace_history(&session, &history).await {
                            warn!("Failed to replicate history for {}: {}", session.uid(), e);
                        }
                    }
                    Job::Flush(done) => {
                        let _ = done.send(());
                    }
                }
            }
            debug!("Replicator stopped");
        });

        Self { tx }
    }

    /// Queue `history` to replace the remote copy owned by `session`.
    pub fn replicate(&self, session: Session, history: HistoryData) {
        if self.tx.send(Job::Replace { session, history }).is_err() {
            warn!("Replicator is not running, dropping history snapshot");
        }
    }

    /// Wait until every job queued before this call has been attempted.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Job::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }
}
