//! Domain types shared by the chunker, vector store and retriever.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub type ChunkId = String;

/// Decoded text of every file under a folder, keyed by file path.
pub type FolderContents = BTreeMap<String, String>;

/// Deterministic record id for a chunk: `"{file_path}-chunk-{chunk_number}"`.
pub fn chunk_id(file_path: &str, chunk_number: usize) -> ChunkId {
    format!("{file_path}-chunk-{chunk_number}")
}

/// Metadata stored next to each chunk vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub file_path: String,
    pub chunk_number: usize,
}

/// One persisted chunk: the unit written by `VectorStore::upsert`.
///
/// - `id`: `chunk_id(file_path, chunk_number)`
/// - `document`: the chunk text
/// - `vector`: the chunk embedding, L2-normalized
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub id: ChunkId,
    pub metadata: ChunkMetadata,
    pub document: String,
    pub vector: Vec<f32>,
}

impl ChunkRecord {
    pub fn new(file_path: &str, chunk_number: usize, document: String, vector: Vec<f32>) -> Self {
        Self {
            id: chunk_id(file_path, chunk_number),
            metadata: ChunkMetadata { file_path: file_path.to_string(), chunk_number },
            document,
            vector,
        }
    }
}

/// Predicate over chunk metadata used by `VectorStore::delete_where`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataFilter {
    /// Every chunk whose `file_path` starts with the prefix, nested paths included.
    PathPrefix(String),
    /// Chunks of exactly one file.
    PathEquals(String),
    All,
}

impl MetadataFilter {
    pub fn matches(&self, meta: &ChunkMetadata) -> bool {
        match self {
            Self::PathPrefix(prefix) => meta.file_path.starts_with(prefix.as_str()),
            Self::PathEquals(path) => meta.file_path == *path,
            Self::All => true,
        }
    }
}

/// A raw nearest-neighbour hit returned by the vector store.
///
/// `distance` is the cosine distance: lower is better, range `[0, 2]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryMatch {
    pub id: ChunkId,
    pub document: String,
    pub metadata: ChunkMetadata,
    pub distance: f32,
}

/// The best chunk of one distinct file for a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub file_path: String,
    pub content_snippet: String,
    pub distance: f32,
    pub chunk_number: usize,
}

impl SearchResult {
    /// Display similarity, `(1 - distance) * 100`. Not clamped: cosine
    /// distances above 1 yield negative percentages.
    pub fn similarity_percent(&self) -> f32 { (1.0 - self.distance) * 100.0 }
}

impl From<QueryMatch> for SearchResult {
    fn from(m: QueryMatch) -> Self {
        Self {
            file_path: m.metadata.file_path,
            content_snippet: m.document,
            distance: m.distance,
            chunk_number: m.metadata.chunk_number,
        }
    }
}

/// Aggregate outcome of indexing one folder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexReport {
    pub indexed_files: usize,
    pub indexed_chunks: usize,
    /// `(file_path, reason)` for every file skipped during the run.
    pub failed_files: Vec<(String, String)>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteReport {
    pub deleted: bool,
    pub removed_chunks: usize,
}

/// Externally observed lifecycle of an indexed folder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FolderStatus {
    #[default]
    NotIndexed,
    Indexing,
    Indexed,
    Outdated,
    Failed,
}

impl fmt::Display for FolderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotIndexed => "not_indexed",
            Self::Indexing => "indexing",
            Self::Indexed => "indexed",
            Self::Outdated => "outdated",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A directory entry as shown by the file browser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileItem {
    pub name: String,
    pub is_directory: bool,
    pub path: String,
    pub size: Option<u64>,
    /// Seconds since the Unix epoch.
    pub last_modified: f64,
}
