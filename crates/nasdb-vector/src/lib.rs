//! LanceDB-backed `VectorStore`.
//!
//! Each chunk is one row keyed by its deterministic id; writes are
//! `merge_insert` upserts so re-indexing a file overwrites in place.

pub mod schema;
pub mod store;
pub mod table;

pub use store::LanceStore;
