//! Write-through to the remote service.
//!
//! Local writes go first and are authoritative for the session. Remote
//! pushes are queued to one background worker, so the remote sees them in the
//! order the local writes happened. The caller may await or drop each push's
//! result; a failed push is logged and the local row is kept.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::bus::ChangeKind;
use crate::queries::documents;
use crate::tables::{Record, Repository};
use crate::{Store, StoreError, Table};

/// Remote sync errors. Never surfaced through the store itself.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("remote unreachable: {0}")]
    Unreachable(String),

    #[error("remote rejected {table}/{key}: {reason}")]
    Rejected {
        table: Table,
        key: String,
        reason: String,
    },

    #[error("could not encode document: {0}")]
    Encode(String),

    #[error("background task failed: {0}")]
    Task(String),
}

/// One change to replay against the remote service.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RemoteOp {
    Upsert {
        table: Table,
        key: String,
        document: Value,
    },
    Delete {
        table: Table,
        key: String,
    },
}

impl RemoteOp {
    pub fn table(&self) -> Table {
        match self {
            RemoteOp::Upsert { table, .. } | RemoteOp::Delete { table, .. } => *table,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            RemoteOp::Upsert { key, .. } | RemoteOp::Delete { key, .. } => key,
        }
    }
}

/// The remote service, as far as the store is concerned.
#[async_trait]
pub trait RemoteSync: Send + Sync {
    /// Apply one local change remotely.
    async fn push(&self, op: RemoteOp) -> Result<(), SyncError>;

    /// Fetch the remote copy of `table`.
    async fn fetch(&self, table: Table) -> Result<Vec<Value>, SyncError>;
}

/// Handle to a background push.
pub type SyncHandle = JoinHandle<Result<(), SyncError>>;

type Queued = (RemoteOp, oneshot::Sender<Result<(), SyncError>>);

/// Store plus remote, with optimistic local writes.
///
/// Clones share one push queue.
#[derive(Clone)]
pub struct WriteThrough {
    store: Arc<Store>,
    remote: Arc<dyn RemoteSync>,
    queue: Arc<OnceLock<mpsc::UnboundedSender<Queued>>>,
}

impl WriteThrough {
    pub fn new(store: Arc<Store>, remote: Arc<dyn RemoteSync>) -> Self {
        Self {
            store,
            remote,
            queue: Arc::new(OnceLock::new()),
        }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Upsert locally, then push in the background.
    pub async fn set<R: Record>(&self, record: &R) -> SyncHandle {
        Repository::<R>::new(&self.store).set(record).await;

        match serde_json::to_value(record) {
            Ok(document) => self.push(RemoteOp::Upsert {
                table: R::TABLE,
                key: record.key(),
                document,
            }),
            Err(e) => {
                let error = SyncError::Encode(e.to_string());
                warn!(table = %R::TABLE, "not pushing: {error}");
                tokio::spawn(async move { Err(error) })
            }
        }
    }

    /// Delete locally, then push in the background.
    pub async fn delete<R: Record>(&self, key: &str) -> SyncHandle {
        Repository::<R>::new(&self.store).delete(key).await;
        self.push(RemoteOp::Delete {
            table: R::TABLE,
            key: key.to_string(),
        })
    }

    fn push(&self, op: RemoteOp) -> SyncHandle {
        let queue = self
            .queue
            .get_or_init(|| spawn_pusher(Arc::clone(&self.remote)));
        let (done_tx, done_rx) = oneshot::channel();
        let queued = queue.send((op, done_tx));
        tokio::spawn(async move {
            if let Err(mpsc::error::SendError((op, _))) = queued {
                return Err(SyncError::Task(format!(
                    "push queue closed before {}/{}",
                    op.table(),
                    op.key()
                )));
            }
            match done_rx.await {
                Ok(result) => result,
                Err(_) => Err(SyncError::Task("push worker stopped".into())),
            }
        })
    }

    /// Upsert the remote copy of `R`'s table into the engine, in one write.
    /// Local rows the remote does not have are kept.
    ///
    /// Documents that do not decode as `R` are skipped. Returns how many were
    /// applied; 0 when the fetch fails, with the local engine untouched.
    pub async fn pull<R: Record>(&self) -> usize {
        let fetched = match self.remote.fetch(R::TABLE).await {
            Ok(docs) => docs,
            Err(e) => {
                warn!(table = %R::TABLE, "fetch failed, using local data: {e}");
                return 0;
            }
        };

        let records: Vec<R> = fetched
            .into_iter()
            .filter_map(|doc| {
                serde_json::from_value(doc)
                    .map_err(|e| debug!(table = %R::TABLE, "skipping remote document: {e}"))
                    .ok()
            })
            .collect();
        if records.is_empty() {
            return 0;
        }

        let applied = records.len();
        self.store
            .write_with(R::TABLE, ChangeKind::Upsert, |conn| {
                let tx = conn.unchecked_transaction()?;
                for record in &records {
                    documents::upsert(&tx, R::TABLE, &record.key(), record, record.timestamp())?;
                }
                tx.commit().map_err(StoreError::from)
            })
            .await;
        applied
    }
}

/// Drain the push queue one op at a time until every sender is gone.
fn spawn_pusher(remote: Arc<dyn RemoteSync>) -> mpsc::UnboundedSender<Queued> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Queued>();
    tokio::spawn(async move {
        while let Some((op, done)) = rx.recv().await {
            let (table, key) = (op.table(), op.key().to_string());
            let result = remote.push(op).await;
            match &result {
                Ok(()) => debug!(table = %table, key, "pushed"),
                Err(e) => warn!(table = %table, key, "push failed, keeping local copy: {e}"),
            }
            // The caller may have dropped its handle.
            let _ = done.send(result);
        }
        debug!("push queue closed");
    });
    tx
}
