use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use nasdb_core::chunker::Chunker;
use nasdb_core::error::{Error, Result};
use nasdb_core::traits::{Embedder, VectorStore};
use nasdb_core::types::{ChunkRecord, FolderContents, FolderStatus, MetadataFilter, QueryMatch};
use nasdb_embed::FakeEmbedder;
use nasdb_index::{IndexManager, IndexWorker, JobOutcome};
use nasdb_vector::LanceStore;

const DIM: usize = 16;

async fn worker(tmp: &TempDir) -> (IndexWorker, Arc<IndexManager>) {
    worker_with(tmp, Arc::new(FakeEmbedder::new(DIM))).await
}

async fn worker_with(tmp: &TempDir, embedder: Arc<dyn Embedder>) -> (IndexWorker, Arc<IndexManager>) {
    let store = LanceStore::open(&tmp.path().to_string_lossy(), "file_contents", DIM).await.unwrap();
    let manager = Arc::new(IndexManager::new(Chunker::default(), embedder, Arc::new(store)));
    (IndexWorker::spawn(Arc::clone(&manager)), manager)
}

fn docs() -> FolderContents {
    [("/docs/a.txt", "alpha"), ("/docs/sub/b.txt", "bravo")].into_iter().map(|(p, t)| (p.to_string(), t.to_string())).collect()
}

#[tokio::test]
async fn index_job_reports_and_marks_folder_indexed() {
    let tmp = TempDir::new().unwrap();
    let (worker, _manager) = worker(&tmp).await;
    assert_eq!(worker.status("/docs").await, FolderStatus::NotIndexed);

    let handle = worker.submit_index("/docs", docs()).await.unwrap();
    let JobOutcome::Indexed(report) = handle.wait().await.unwrap() else { panic!("expected index outcome") };
    assert_eq!(report.indexed_files, 2);
    assert_eq!(worker.status("/docs").await, FolderStatus::Indexed);

    assert!(worker.mark_outdated("/docs").await);
    assert_eq!(worker.status("/docs").await, FolderStatus::Outdated);
    assert!(!worker.mark_outdated("/never").await);
    worker.shutdown().await.unwrap();
}

#[tokio::test]
async fn delete_submitted_after_index_wins() {
    let tmp = TempDir::new().unwrap();
    let (worker, manager) = worker(&tmp).await;

    let index = worker.submit_index("/docs", docs()).await.unwrap();
    let delete = worker.submit_delete("/docs").await.unwrap();
    let JobOutcome::Deleted(report) = delete.wait().await.unwrap() else { panic!("expected delete outcome") };
    assert_eq!(report.removed_chunks, 2);
    assert!(matches!(index.wait().await.unwrap(), JobOutcome::Indexed(_)));

    assert!(manager.list_indexed_files().await.unwrap().is_empty());
    assert_eq!(worker.status("/docs").await, FolderStatus::NotIndexed);
    worker.shutdown().await.unwrap();
}

#[tokio::test]
async fn reset_job_clears_everything() {
    let tmp = TempDir::new().unwrap();
    let (worker, manager) = worker(&tmp).await;
    worker.submit_index("/docs", docs()).await.unwrap();
    let outcome = worker.submit_reset().await.unwrap().wait().await.unwrap();
    assert_eq!(outcome, JobOutcome::Reset);
    assert_eq!(manager.store().count().await.unwrap(), 0);
    assert!(worker.statuses().await.is_empty());
    worker.shutdown().await.unwrap();
}

/// Holds each batch long enough for the test to look at the queue mid-job.
struct SlowEmbedder(FakeEmbedder);

impl Embedder for SlowEmbedder {
    fn model_id(&self) -> &str { "slow" }
    fn dim(&self) -> usize { self.0.dim() }
    fn max_len(&self) -> usize { self.0.max_len() }
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        std::thread::sleep(Duration::from_millis(800));
        self.0.embed_batch(texts)
    }
}

#[tokio::test]
async fn delete_does_not_clear_a_queued_index() {
    let tmp = TempDir::new().unwrap();
    let (worker, manager) = worker_with(&tmp, Arc::new(SlowEmbedder(FakeEmbedder::new(DIM)))).await;

    let delete = worker.submit_delete("/docs").await.unwrap();
    let index = worker.submit_index("/docs", docs()).await.unwrap();
    assert_eq!(worker.status("/docs").await, FolderStatus::Indexing);

    assert!(matches!(delete.wait().await.unwrap(), JobOutcome::Deleted(_)));
    assert_eq!(worker.status("/docs").await, FolderStatus::Indexing);

    assert!(matches!(index.wait().await.unwrap(), JobOutcome::Indexed(_)));
    assert_eq!(worker.status("/docs").await, FolderStatus::Indexed);
    assert_eq!(manager.list_indexed_files().await.unwrap().len(), 2);
    worker.shutdown().await.unwrap();
}

#[tokio::test]
async fn reset_keeps_pending_index_status() {
    let tmp = TempDir::new().unwrap();
    let (worker, _manager) = worker_with(&tmp, Arc::new(SlowEmbedder(FakeEmbedder::new(DIM)))).await;

    let reset = worker.submit_reset().await.unwrap();
    let index = worker.submit_index("/docs", docs()).await.unwrap();
    assert_eq!(reset.wait().await.unwrap(), JobOutcome::Reset);
    assert_eq!(worker.status("/docs").await, FolderStatus::Indexing);

    index.wait().await.unwrap();
    assert_eq!(worker.status("/docs").await, FolderStatus::Indexed);
    worker.shutdown().await.unwrap();
}

/// Rejects every write.
struct BrokenStore;

#[async_trait]
impl VectorStore for BrokenStore {
    async fn upsert(&self, _records: &[ChunkRecord]) -> Result<()> { Err(Error::Store("disk full".into())) }
    async fn delete_where(&self, _filter: &MetadataFilter) -> Result<usize> { Ok(0) }
    async fn query(&self, _vector: &[f32], _k: usize) -> Result<Vec<QueryMatch>> { Ok(Vec::new()) }
    async fn reset(&self) -> Result<()> { Ok(()) }
    async fn count(&self) -> Result<usize> { Ok(0) }
    async fn file_paths(&self) -> Result<BTreeSet<String>> { Ok(BTreeSet::new()) }
}

#[tokio::test]
async fn store_failure_marks_folder_failed() {
    let manager = Arc::new(IndexManager::new(Chunker::default(), Arc::new(FakeEmbedder::new(DIM)), Arc::new(BrokenStore)));
    let worker = IndexWorker::spawn(manager);
    let result = worker.submit_index("/docs", docs()).await.unwrap().wait().await;
    assert!(matches!(result, Err(Error::Store(_))));
    assert_eq!(worker.status("/docs").await, FolderStatus::Failed);
    worker.shutdown().await.unwrap();
}
