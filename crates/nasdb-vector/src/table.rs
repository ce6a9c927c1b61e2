//! LanceDB connection and table bootstrap.

use lancedb::{connect, Connection, Table};
use arrow_array::RecordBatchIterator;
use std::sync::Arc;

use nasdb_core::error::{Error, Result};

use crate::schema::{build_chunk_schema, vector_dim};

pub async fn open_db(uri: &str) -> Result<Connection> {
	connect(uri).execute().await.map_err(Error::store)
}

/// Vector width of an existing table, `None` when the table does not exist.
pub async fn stored_dim(conn: &Connection, name: &str) -> Result<Option<usize>> {
	let names = conn.table_names().execute().await.map_err(Error::store)?;
	if !names.iter().any(|n| n == name) { return Ok(None); }
	let table = conn.open_table(name).execute().await.map_err(Error::store)?;
	let schema = table.schema().await.map_err(Error::store)?;
	Ok(vector_dim(&schema).and_then(|d| usize::try_from(d).ok()))
}

/// Opens `name`, creating it empty when missing. An existing table whose
/// vector width differs from `dim` is a configuration error: its vectors came
/// from another embedding model.
pub async fn ensure_table(conn: &Connection, name: &str, dim: usize) -> Result<Table> {
	let width = i32::try_from(dim).map_err(|_| Error::InvalidConfig(format!("embedding dimension {dim} is too large")))?;
	let names = conn.table_names().execute().await.map_err(Error::store)?;
	if names.iter().any(|n| n == name) {
		let table = conn.open_table(name).execute().await.map_err(Error::store)?;
		let schema = table.schema().await.map_err(Error::store)?;
		match vector_dim(&schema) {
			Some(existing) if existing == width => return Ok(table),
			Some(existing) => {
				return Err(Error::InvalidConfig(format!(
					"table '{name}' stores {existing}-dim vectors but the embedder produces {dim}; point store.table at a new table or remove the store directory"
				)))
			}
			None => return Err(Error::InvalidConfig(format!("table '{name}' has no vector column"))),
		}
	}
	tracing::info!(table = name, dim, "creating chunk table");
	let schema = build_chunk_schema(width);
	let empty = RecordBatchIterator::new(vec![].into_iter(), Arc::clone(&schema));
	conn.create_table(name, Box::new(empty)).execute().await.map_err(Error::store)
}
