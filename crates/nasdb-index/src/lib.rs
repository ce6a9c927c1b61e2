//! Indexing and retrieval over a `VectorStore`.
//!
//! `IndexManager` turns decoded folder contents into chunk records,
//! `Retriever` answers queries with one result per file, and `IndexWorker`
//! serialises write jobs behind a FIFO queue.

pub mod manager;
pub mod retriever;
pub mod worker;

pub use manager::IndexManager;
pub use retriever::{rank_and_dedup, Retriever};
pub use worker::{IndexWorker, Job, JobHandle, JobOutcome};

use std::sync::Arc;

use nasdb_core::error::{Error, Result};
use nasdb_core::traits::Embedder;

/// Runs the CPU-bound embedder off the async runtime.
pub(crate) async fn embed_blocking(embedder: &Arc<dyn Embedder>, texts: Vec<String>) -> Result<anyhow::Result<Vec<Vec<f32>>>> {
    let embedder = Arc::clone(embedder);
    tokio::task::spawn_blocking(move || embedder.embed_batch(&texts))
        .await
        .map_err(|e| Error::Operation(format!("embedding task failed: {e}")))
}
