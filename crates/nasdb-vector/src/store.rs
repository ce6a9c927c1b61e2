use arrow_array::cast::AsArray;
use arrow_array::types::{Float32Type, Int32Type};
use arrow_array::{Array, ArrayRef, FixedSizeListArray, Int32Array, RecordBatch, RecordBatchIterator, StringArray, TimestampMillisecondArray};
use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase, Select};
use lancedb::{DistanceType, Table};
use std::collections::BTreeSet;
use std::sync::Arc;

use nasdb_core::error::{Error, Result};
use nasdb_core::traits::VectorStore;
use nasdb_core::types::{ChunkMetadata, ChunkRecord, MetadataFilter, QueryMatch};

use crate::schema::{build_chunk_schema, RESULT_COLUMNS};
use crate::table::{ensure_table, open_db};

/// Chunk collection backed by one LanceDB table, compared by cosine distance.
#[derive(Clone)]
pub struct LanceStore {
	table: Table,
	dim: usize,
}

impl LanceStore {
	pub async fn open(uri: &str, table_name: &str, dim: usize) -> Result<Self> {
		let conn = open_db(uri).await?;
		let table = ensure_table(&conn, table_name, dim).await?;
		tracing::debug!(uri, table = table_name, dim, "vector store opened");
		Ok(Self { table, dim })
	}

	pub fn dim(&self) -> usize { self.dim }

	fn check_dim(&self, len: usize, what: &str) -> Result<()> {
		if len == self.dim { return Ok(()); }
		Err(Error::InvalidConfig(format!("{what} has {len} dimensions, store expects {}", self.dim)))
	}

	fn to_record_batch(&self, records: &[ChunkRecord]) -> Result<RecordBatch> {
		let width = i32::try_from(self.dim).map_err(Error::store)?;
		let now = Utc::now().timestamp_millis();
		let mut chunk_numbers = Vec::with_capacity(records.len());
		for r in records {
			self.check_dim(r.vector.len(), &r.id)?;
			chunk_numbers.push(i32::try_from(r.metadata.chunk_number).map_err(Error::store)?);
		}
		let vectors = records.iter().map(|r| Some(r.vector.iter().copied().map(Some).collect::<Vec<_>>()));
		let columns: Vec<ArrayRef> = vec![
			Arc::new(StringArray::from_iter_values(records.iter().map(|r| r.id.as_str()))),
			Arc::new(StringArray::from_iter_values(records.iter().map(|r| r.metadata.file_path.as_str()))),
			Arc::new(Int32Array::from(chunk_numbers)),
			Arc::new(StringArray::from_iter_values(records.iter().map(|r| r.document.as_str()))),
			Arc::new(TimestampMillisecondArray::from(vec![now; records.len()])),
			Arc::new(FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(vectors, width)),
		];
		RecordBatch::try_new(build_chunk_schema(width), columns).map_err(Error::store)
	}

	/// SQL predicate selecting the rows `filter` matches, or `None` when no row can match.
	///
	/// Prefixes are resolved against the stored paths and deleted by exact
	/// value, so `%` and `_` in file names never act as wildcards.
	async fn predicate(&self, filter: &MetadataFilter) -> Result<Option<String>> {
		match filter {
			MetadataFilter::All => Ok(Some("true".to_string())),
			MetadataFilter::PathEquals(path) => Ok(Some(format!("file_path = {}", sql_string(path)))),
			MetadataFilter::PathPrefix(prefix) => {
				let paths: Vec<String> = self.file_paths().await?.into_iter().filter(|p| p.starts_with(prefix.as_str())).map(|p| sql_string(&p)).collect();
				if paths.is_empty() { return Ok(None); }
				Ok(Some(format!("file_path IN ({})", paths.join(", "))))
			}
		}
	}

	async fn all_rows_limit(&self) -> Result<Option<usize>> {
		let n = self.table.count_rows(None).await.map_err(Error::store)?;
		Ok((n > 0).then_some(n))
	}
}

fn sql_string(s: &str) -> String { format!("'{}'", s.replace('\'', "''")) }

fn column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ArrayRef> {
	batch.column_by_name(name).ok_or_else(|| Error::Store(format!("result is missing column '{name}'")))
}

fn matches_from_batch(batch: &RecordBatch, out: &mut Vec<QueryMatch>) -> Result<()> {
	let ids = column(batch, "id")?.as_string::<i32>();
	let paths = column(batch, "file_path")?.as_string::<i32>();
	let numbers = column(batch, "chunk_number")?.as_primitive::<Int32Type>();
	let documents = column(batch, "document")?.as_string::<i32>();
	let distances = column(batch, "_distance")?.as_primitive::<Float32Type>();
	for i in 0..batch.num_rows() {
		if !ids.is_valid(i) || !distances.is_valid(i) { continue; }
		let chunk_number = usize::try_from(numbers.value(i))
			.map_err(|_| Error::Store(format!("invalid chunk_number {} for {}", numbers.value(i), ids.value(i))))?;
		out.push(QueryMatch {
			id: ids.value(i).to_string(),
			document: documents.value(i).to_string(),
			metadata: ChunkMetadata { file_path: paths.value(i).to_string(), chunk_number },
			distance: distances.value(i),
		});
	}
	Ok(())
}

#[async_trait]
impl VectorStore for LanceStore {
	async fn upsert(&self, records: &[ChunkRecord]) -> Result<()> {
		if records.is_empty() { return Ok(()); }
		let batch = self.to_record_batch(records)?;
		let schema = batch.schema();
		let reader = RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema);
		let mut merge = self.table.merge_insert(&["id"]);
		merge.when_matched_update_all(None).when_not_matched_insert_all();
		merge.execute(Box::new(reader)).await.map_err(Error::store)?;
		tracing::debug!(records = records.len(), "upserted chunks");
		Ok(())
	}

	async fn delete_where(&self, filter: &MetadataFilter) -> Result<usize> {
		let Some(predicate) = self.predicate(filter).await? else { return Ok(0) };
		let removed = self.table.count_rows(Some(predicate.clone())).await.map_err(Error::store)?;
		if removed > 0 {
			self.table.delete(&predicate).await.map_err(Error::store)?;
		}
		tracing::debug!(?filter, removed, "deleted chunks");
		Ok(removed)
	}

	async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<QueryMatch>> {
		self.check_dim(vector.len(), "query vector")?;
		if k == 0 || self.all_rows_limit().await?.is_none() { return Ok(Vec::new()); }
		let batches: Vec<RecordBatch> = self
			.table
			.query()
			.nearest_to(vector)
			.map_err(Error::store)?
			.distance_type(DistanceType::Cosine)
			.select(Select::columns(&RESULT_COLUMNS))
			.limit(k)
			.execute()
			.await
			.map_err(Error::store)?
			.try_collect()
			.await
			.map_err(Error::store)?;
		let mut matches = Vec::new();
		for batch in &batches { matches_from_batch(batch, &mut matches)?; }
		matches.sort_by(|a, b| a.distance.total_cmp(&b.distance));
		matches.truncate(k);
		Ok(matches)
	}

	async fn reset(&self) -> Result<()> {
		self.table.delete("true").await.map_err(Error::store)?;
		tracing::info!("vector store reset");
		Ok(())
	}

	async fn count(&self) -> Result<usize> {
		self.table.count_rows(None).await.map_err(Error::store)
	}

	async fn file_paths(&self) -> Result<BTreeSet<String>> {
		let Some(limit) = self.all_rows_limit().await? else { return Ok(BTreeSet::new()) };
		let batches: Vec<RecordBatch> = self
			.table
			.query()
			.select(Select::columns(&["file_path"]))
			.limit(limit)
			.execute()
			.await
			.map_err(Error::store)?
			.try_collect()
			.await
			.map_err(Error::store)?;
		let mut paths = BTreeSet::new();
		for batch in &batches {
			let Some(col) = batch.column_by_name("file_path") else { continue };
			paths.extend(col.as_string::<i32>().iter().flatten().map(str::to_string));
		}
		Ok(paths)
	}
}
