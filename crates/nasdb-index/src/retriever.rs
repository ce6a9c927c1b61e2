use std::collections::HashSet;
use std::sync::Arc;

use nasdb_core::config::SearchSettings;
use nasdb_core::error::{Error, Result};
use nasdb_core::traits::{Embedder, VectorStore};
use nasdb_core::types::{QueryMatch, SearchResult};

use crate::embed_blocking;

/// File-level semantic search: one result per file, best chunk wins.
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    defaults: SearchSettings,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>, defaults: SearchSettings) -> Self {
        Self { embedder, store, defaults }
    }

    pub async fn search_default(&self, query: &str) -> Result<Vec<SearchResult>> {
        self.search(query, self.defaults.n_results, self.defaults.candidate_n_results).await
    }

    /// Fetches `candidate_n_results` nearest chunks (never fewer than
    /// `n_results`) and keeps the closest chunk of each file.
    ///
    /// A file whose chunks all fall outside the candidate window is missed;
    /// widen the window to trade latency for recall.
    pub async fn search(&self, query: &str, n_results: usize, candidate_n_results: usize) -> Result<Vec<SearchResult>> {
        if n_results == 0 { return Ok(Vec::new()); }
        let stored = self.store.count().await?;
        if stored == 0 {
            tracing::debug!("search on empty index");
            return Ok(Vec::new());
        }
        let candidates = candidate_n_results.max(n_results).min(stored);

        let vector = embed_blocking(&self.embedder, vec![query.to_string()])
            .await?
            .map_err(|e| Error::embedding(format!("{e:#}")))?
            .pop()
            .ok_or_else(|| Error::embedding("embedder returned no vector for the query"))?;

        let matches = self.store.query(&vector, candidates).await?;
        let fetched = matches.len();
        let results = rank_and_dedup(matches, n_results);
        tracing::debug!(candidates, fetched, results = results.len(), "search complete");
        Ok(results)
    }
}

/// Orders matches by ascending distance and keeps the first match per file
/// until `n_results` files are collected. Ties keep their incoming order.
pub fn rank_and_dedup(mut matches: Vec<QueryMatch>, n_results: usize) -> Vec<SearchResult> {
    matches.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    let mut seen = HashSet::new();
    let mut results = Vec::with_capacity(n_results.min(matches.len()));
    for m in matches {
        if results.len() >= n_results { break; }
        if seen.insert(m.metadata.file_path.clone()) {
            results.push(SearchResult::from(m));
        }
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use nasdb_core::types::{chunk_id, ChunkMetadata};

    fn hit(path: &str, n: usize, distance: f32) -> QueryMatch {
        QueryMatch {
            id: chunk_id(path, n),
            document: format!("{path}#{n}"),
            metadata: ChunkMetadata { file_path: path.into(), chunk_number: n },
            distance,
        }
    }

    #[test]
    fn best_chunk_per_file_in_distance_order() {
        let matches = vec![hit("/b", 0, 0.25), hit("/a", 1, 0.30), hit("/a", 0, 0.10), hit("/b", 2, 0.40)];
        let results = rank_and_dedup(matches, 5);
        let got: Vec<(&str, usize, f32)> = results.iter().map(|r| (r.file_path.as_str(), r.chunk_number, r.distance)).collect();
        assert_eq!(got, vec![("/a", 0, 0.10), ("/b", 0, 0.25)]);
    }

    #[test]
    fn stops_at_n_distinct_files() {
        let matches = (0..10).map(|i| hit(&format!("/f{i}"), 0, i as f32 / 10.0)).collect();
        let results = rank_and_dedup(matches, 3);
        assert_eq!(results.len(), 3);
        assert_eq!(results[2].file_path, "/f2");
    }

    #[test]
    fn equal_distances_keep_store_order() {
        let results = rank_and_dedup(vec![hit("/x", 0, 0.2), hit("/y", 0, 0.2)], 2);
        assert_eq!(results[0].file_path, "/x");
        assert_eq!(results[1].file_path, "/y");
    }
}
