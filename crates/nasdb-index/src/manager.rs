use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use nasdb_core::chunker::Chunker;
use nasdb_core::error::{Error, Result};
use nasdb_core::traits::{Embedder, VectorStore};
use nasdb_core::types::{ChunkRecord, DeleteReport, FolderContents, IndexReport, MetadataFilter};

use crate::embed_blocking;

/// Writes folder contents into the vector store and removes them again.
pub struct IndexManager {
    chunker: Chunker,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
}

impl IndexManager {
    pub fn new(chunker: Chunker, embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        Self { chunker, embedder, store }
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> { &self.embedder }
    pub fn store(&self) -> &Arc<dyn VectorStore> { &self.store }

    /// Chunks, embeds and stores one file, replacing whatever was stored for
    /// `path` before. Returns the number of chunks written.
    ///
    /// Embedding problems come back as `Error::Indexing`; store errors pass
    /// through unchanged.
    pub async fn index_file(&self, path: &str, text: &str) -> Result<usize> {
        let chunks = self.chunker.chunk(text);
        let vectors = if chunks.is_empty() {
            Vec::new()
        } else {
            embed_blocking(&self.embedder, chunks.clone())
                .await?
                .map_err(|e| Error::Indexing { path: path.to_string(), reason: format!("{e:#}") })?
        };
        if vectors.len() != chunks.len() {
            return Err(Error::Indexing {
                path: path.to_string(),
                reason: format!("embedder returned {} vectors for {} chunks", vectors.len(), chunks.len()),
            });
        }
        let records: Vec<ChunkRecord> = chunks
            .into_iter()
            .zip(vectors)
            .enumerate()
            .map(|(n, (document, vector))| ChunkRecord::new(path, n, document, vector))
            .collect();

        // A shorter file leaves higher-numbered chunks behind unless cleared first.
        self.store.delete_where(&MetadataFilter::PathEquals(path.to_string())).await?;
        self.store.upsert(&records).await?;
        Ok(records.len())
    }

    /// Indexes every file in `files`. A file whose embedding fails is recorded
    /// in `failed_files` and skipped; a store failure aborts the run.
    pub async fn index_folder(&self, files: &FolderContents) -> Result<IndexReport> {
        let started = Instant::now();
        let mut report = IndexReport::default();
        for (path, text) in files {
            match self.index_file(path, text).await {
                Ok(chunks) => {
                    report.indexed_files += 1;
                    report.indexed_chunks += chunks;
                    tracing::debug!(path = %path, chunks, "indexed file");
                }
                Err(Error::Indexing { path, reason }) => {
                    tracing::warn!(path = %path, reason = %reason, "skipping file");
                    report.failed_files.push((path, reason));
                }
                Err(e) => {
                    tracing::error!(path = %path, error = %e, indexed = report.indexed_files, "indexing aborted");
                    return Err(e);
                }
            }
        }
        tracing::info!(
            files = report.indexed_files,
            chunks = report.indexed_chunks,
            failed = report.failed_files.len(),
            elapsed_ms = started.elapsed().as_millis(),
            "folder indexed"
        );
        Ok(report)
    }

    /// Removes every chunk whose path starts with `prefix`. Deleting a folder
    /// that was never indexed reports `deleted: false`.
    pub async fn delete_folder(&self, prefix: &str) -> Result<DeleteReport> {
        let removed = self.store.delete_where(&MetadataFilter::PathPrefix(prefix.to_string())).await?;
        tracing::info!(prefix, removed, "folder removed from index");
        Ok(DeleteReport { deleted: removed > 0, removed_chunks: removed })
    }

    pub async fn delete_file(&self, path: &str) -> Result<DeleteReport> {
        let removed = self.store.delete_where(&MetadataFilter::PathEquals(path.to_string())).await?;
        tracing::info!(path, removed, "file removed from index");
        Ok(DeleteReport { deleted: removed > 0, removed_chunks: removed })
    }

    pub async fn list_indexed_files(&self) -> Result<BTreeSet<String>> {
        self.store.file_paths().await
    }

    pub async fn reset_all(&self) -> Result<()> {
        self.store.reset().await?;
        tracing::info!("index reset");
        Ok(())
    }
}
