//! Character-window chunking with fixed overlap.
//!
//! Windows are measured in Unicode scalar values. Window `i` starts at
//! `i * (chunk_size - chunk_overlap)`; the scan stops once a window reaches the
//! end of the text, so a text of `L > overlap` characters yields
//! `ceil((L - overlap) / (chunk_size - overlap))` chunks.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_size: 500, chunk_overlap: 50 }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunk_size must be greater than 0".into()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> ChunkingConfig { self.config }

    /// Splits `text` into overlapping windows, left to right.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        self.windows(text).map(str::to_string).collect()
    }

    /// Lazy form of [`Chunker::chunk`]; restartable by calling it again.
    pub fn windows<'a>(&self, text: &'a str) -> Windows<'a> {
        // Byte offset of every char, plus the end of the text.
        let bounds: Vec<usize> = text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect();
        Windows { text, bounds, size: self.config.chunk_size, step: self.config.chunk_size - self.config.chunk_overlap, start: 0, done: text.is_empty() }
    }
}

impl Default for Chunker {
    fn default() -> Self { Self { config: ChunkingConfig::default() } }
}

#[derive(Debug)]
pub struct Windows<'a> {
    text: &'a str,
    bounds: Vec<usize>,
    size: usize,
    step: usize,
    start: usize,
    done: bool,
}

impl<'a> Iterator for Windows<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        if self.done { return None; }
        let char_len = self.bounds.len() - 1;
        let end = (self.start + self.size).min(char_len);
        let window = &self.text[self.bounds[self.start]..self.bounds[end]];
        if end == char_len { self.done = true; } else { self.start += self.step; }
        Some(window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_overlap_not_smaller_than_size() {
        assert!(Chunker::new(ChunkingConfig { chunk_size: 50, chunk_overlap: 50 }).is_err());
        assert!(Chunker::new(ChunkingConfig { chunk_size: 0, chunk_overlap: 0 }).is_err());
    }

    #[test]
    fn windows_respect_char_boundaries() {
        let chunker = Chunker::new(ChunkingConfig { chunk_size: 3, chunk_overlap: 1 }).unwrap();
        let chunks = chunker.chunk("가나다라마");
        assert_eq!(chunks, vec!["가나다", "다라마"]);
    }
}
