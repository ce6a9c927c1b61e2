//! Background write queue.
//!
//! Index, delete and reset jobs run one at a time in submission order on a
//! single task. Searches never go through here.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, RwLock};
use tokio::task::JoinHandle;

use nasdb_core::error::{Error, Result};
use nasdb_core::types::{DeleteReport, FolderContents, FolderStatus, IndexReport};

use crate::manager::IndexManager;

#[derive(Debug)]
pub enum Job {
    Index { folder: String, files: FolderContents },
    Delete { folder: String },
    Reset,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Indexed(IndexReport),
    Deleted(DeleteReport),
    Reset,
}

/// Completion handle returned at submission time.
pub struct JobHandle {
    rx: oneshot::Receiver<Result<JobOutcome>>,
}

impl JobHandle {
    pub async fn wait(self) -> Result<JobOutcome> {
        self.rx.await.map_err(|_| Error::Operation("index worker dropped the job".into()))?
    }
}

struct Envelope {
    job: Job,
    reply: oneshot::Sender<Result<JobOutcome>>,
}

type StatusMap = Arc<RwLock<HashMap<String, FolderStatus>>>;

pub struct IndexWorker {
    tx: mpsc::UnboundedSender<Envelope>,
    statuses: StatusMap,
    task: JoinHandle<()>,
}

impl IndexWorker {
    /// Starts the consumer task on the current runtime.
    pub fn spawn(manager: Arc<IndexManager>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let statuses: StatusMap = Arc::default();
        let task = tokio::spawn(run(manager, rx, Arc::clone(&statuses)));
        Self { tx, statuses, task }
    }

    pub async fn submit(&self, job: Job) -> Result<JobHandle> {
        if let Job::Index { folder, .. } = &job {
            self.statuses.write().await.insert(folder.clone(), FolderStatus::Indexing);
        }
        let (reply, rx) = oneshot::channel();
        self.tx.send(Envelope { job, reply }).map_err(|_| Error::Operation("index worker has shut down".into()))?;
        Ok(JobHandle { rx })
    }

    pub async fn submit_index(&self, folder: &str, files: FolderContents) -> Result<JobHandle> {
        self.submit(Job::Index { folder: folder.to_string(), files }).await
    }

    pub async fn submit_delete(&self, folder: &str) -> Result<JobHandle> {
        self.submit(Job::Delete { folder: folder.to_string() }).await
    }

    pub async fn submit_reset(&self) -> Result<JobHandle> {
        self.submit(Job::Reset).await
    }

    pub async fn status(&self, folder: &str) -> FolderStatus {
        self.statuses.read().await.get(folder).copied().unwrap_or_default()
    }

    pub async fn statuses(&self) -> HashMap<String, FolderStatus> {
        self.statuses.read().await.clone()
    }

    /// Flags an indexed folder whose source files changed. Other states are
    /// left alone; returns whether the flag was set.
    pub async fn mark_outdated(&self, folder: &str) -> bool {
        let mut statuses = self.statuses.write().await;
        match statuses.get_mut(folder) {
            Some(status @ FolderStatus::Indexed) => {
                *status = FolderStatus::Outdated;
                true
            }
            _ => false,
        }
    }

    /// Finishes queued jobs, then stops the consumer.
    pub async fn shutdown(self) -> Result<()> {
        drop(self.tx);
        self.task.await.map_err(|e| Error::Operation(format!("index worker panicked: {e}")))
    }
}

async fn run(manager: Arc<IndexManager>, mut rx: mpsc::UnboundedReceiver<Envelope>, statuses: StatusMap) {
    while let Some(Envelope { job, reply }) = rx.recv().await {
        let outcome = match job {
            Job::Index { folder, files } => {
                let result = manager.index_folder(&files).await;
                let status = if result.is_ok() { FolderStatus::Indexed } else { FolderStatus::Failed };
                statuses.write().await.insert(folder, status);
                result.map(JobOutcome::Indexed)
            }
            Job::Delete { folder } => {
                let result = manager.delete_folder(&folder).await;
                if result.is_ok() {
                    // An index job queued behind this one keeps its pending state.
                    statuses.write().await.retain(|f, s| *s == FolderStatus::Indexing || !f.starts_with(folder.as_str()));
                }
                result.map(JobOutcome::Deleted)
            }
            Job::Reset => {
                let result = manager.reset_all().await;
                if result.is_ok() {
                    statuses.write().await.retain(|_, s| *s == FolderStatus::Indexing);
                }
                result.map(|()| JobOutcome::Reset)
            }
        };
        if let Err(e) = &outcome {
            tracing::error!(error = %e, "index job failed");
        }
        if reply.send(outcome).is_err() {
            tracing::debug!("job handle dropped before completion");
        }
    }
    tracing::debug!("index worker stopped");
}
