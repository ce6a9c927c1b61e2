use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to index {path}: {reason}")]
    Indexing { path: String, reason: String },

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    Store(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Operation failed: {0}")]
    Operation(String),
}

impl Error {
    pub fn store(e: impl std::fmt::Display) -> Self { Self::Store(e.to_string()) }

    pub fn embedding(e: impl std::fmt::Display) -> Self { Self::Embedding(e.to_string()) }
}

pub type Result<T> = std::result::Result<T, Error>;
