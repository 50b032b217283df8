//! Shared fixtures for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use joe_rag::document::{ChunkMetadata, VectorStoreEntry};
use joe_rag::embedding::EmbeddingProvider;

/// Deterministic bag-of-words embedder: every whitespace-separated token
/// increments one hashed bucket. Identical texts get identical vectors.
pub struct HashEmbedder {
    pub dimensions: usize,
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> joe_rag::Result<Vec<f32>> {
        let mut v = vec![0.0f32; self.dimensions];
        for token in text.split_whitespace() {
            let hash =
                token.bytes().fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
            v[(hash % self.dimensions as u64) as usize] += 1.0;
        }
        Ok(v)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "hash"
    }
}

pub fn entry(id: &str, text: &str, embedding: Vec<f32>) -> VectorStoreEntry {
    VectorStoreEntry {
        id: id.to_string(),
        text: text.to_string(),
        embedding,
        metadata: ChunkMetadata::from_source("mill-report.txt").with_section("Chunk 1"),
    }
}
