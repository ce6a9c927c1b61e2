use std::hash::{Hash, Hasher};
use twox_hash::XxHash64;

use nasdb_core::traits::Embedder;

/// Deterministic bag-of-words embedder for tests and offline runs.
///
/// Each whitespace token lands in a hashed bucket, so texts sharing words
/// get a small cosine distance. Vectors are unit length.
pub struct FakeEmbedder {
    dim: usize,
    model_id: String,
}

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1), model_id: format!("fake-xxhash64-{dim}") }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for (i, token) in text.split_whitespace().enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.to_lowercase().hash(&mut hasher);
            let h = hasher.finish();
            let idx = usize::try_from(h % self.dim as u64).unwrap_or(0);
            let weight = f32::from(u16::try_from(h >> 48).unwrap_or(u16::MAX)) / f32::from(u16::MAX);
            v[idx] += 1.0 + 0.25 * weight + (i % 3) as f32 * 0.01;
        }
        if v.iter().all(|x| *x == 0.0) {
            // Empty text still needs a valid direction for cosine distance.
            v[0] = 1.0;
            return v;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        for x in &mut v { *x /= norm; }
        v
    }
}

impl Embedder for FakeEmbedder {
    fn model_id(&self) -> &str { &self.model_id }
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { usize::MAX }

    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}
