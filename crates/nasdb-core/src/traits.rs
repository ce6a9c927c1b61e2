use async_trait::async_trait;
use std::collections::BTreeSet;

use crate::error::Result;
use crate::types::{ChunkRecord, FileItem, FolderContents, MetadataFilter, QueryMatch};

/// Sentence-embedding model. Loaded once, shared read-only across tasks.
pub trait Embedder: Send + Sync {
    /// Stable identifier of the model, e.g. `BM-K/KoSimCSE-roberta`.
    fn model_id(&self) -> &str;
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    /// Embeds `texts` in order. Every returned vector has length `dim()`.
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;

    fn embed_one(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("embedder returned no vector"))
    }
}

/// Durable collection of chunk vectors.
///
/// Each write call is one atomic unit: concurrent readers see the collection
/// either before or after it, and it is durable once the call returns.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Inserts records, overwriting any existing record with the same id.
    async fn upsert(&self, records: &[ChunkRecord]) -> Result<()>;
    /// Removes every record matching `filter`; returns how many were removed.
    async fn delete_where(&self, filter: &MetadataFilter) -> Result<usize>;
    /// Up to `k` nearest records, ascending by distance.
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<QueryMatch>>;
    async fn reset(&self) -> Result<()>;
    async fn count(&self) -> Result<usize>;
    /// Distinct `file_path` values present in the collection.
    async fn file_paths(&self) -> Result<BTreeSet<String>>;
}

/// Source of decoded file text, e.g. a local mount or a NAS session.
pub trait FileSource: Send + Sync {
    fn list(&self, path: &str) -> Result<Vec<FileItem>>;
    fn read_folder(&self, path: &str) -> Result<FolderContents>;
}
