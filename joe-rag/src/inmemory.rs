//! In-memory vector store using cosine similarity.
//!
//! This module provides [`InMemoryVectorStore`], a process-local store backed
//! by an insertion-ordered `Vec` protected by a `tokio::sync::RwLock`. Data
//! lives as long as the store object does.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::document::{SearchResult, VectorStoreEntry};
use crate::error::{RagError, Result};
use crate::similarity::rank;
use crate::vectorstore::VectorStore;

const BACKEND: &str = "InMemory";

#[derive(Debug, Default)]
struct Entries {
    items: Vec<VectorStoreEntry>,
    positions: HashMap<String, usize>,
}

/// An in-memory vector store using cosine similarity for search.
///
/// Entries keep their insertion order, which breaks ties between equal
/// scores. Inserting an id that is already stored replaces that entry in
/// place.
///
/// # Example
///
/// ```rust,ignore
/// use joe_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::with_dimensions(1536);
/// store.insert(&entries).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    entries: RwLock<Entries>,
    dimensions: Option<usize>,
}

impl InMemoryVectorStore {
    /// Create a new empty store accepting vectors of any length.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new empty store that only accepts vectors of `dimensions`.
    pub fn with_dimensions(dimensions: usize) -> Self {
        Self { entries: RwLock::default(), dimensions: Some(dimensions) }
    }

    /// The fixed dimension, if one was configured.
    pub fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }

    fn check(&self, entries: &[VectorStoreEntry]) -> Result<()> {
        let Some(expected) = self.dimensions else {
            return Ok(());
        };
        match entries.iter().find(|e| e.embedding.len() != expected) {
            Some(bad) => Err(RagError::store(
                BACKEND,
                format!(
                    "entry '{}' has {} dimensions, store expects {expected}",
                    bad.id,
                    bad.embedding.len()
                ),
            )),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn name(&self) -> &str {
        BACKEND
    }

    async fn insert(&self, entries: &[VectorStoreEntry]) -> Result<()> {
        self.check(entries)?;

        let mut guard = self.entries.write().await;
        let Entries { items, positions } = &mut *guard;
        for entry in entries {
            match positions.get(&entry.id) {
                Some(&at) => items[at] = entry.clone(),
                None => {
                    positions.insert(entry.id.clone(), items.len());
                    items.push(entry.clone());
                }
            }
        }
        debug!(backend = BACKEND, inserted = entries.len(), total = items.len(), "stored entries");
        Ok(())
    }

    async fn query(&self, embedding: &[f32], top_k: usize) -> Result<Vec<SearchResult>> {
        let guard = self.entries.read().await;
        Ok(rank(&guard.items, embedding, top_k))
    }

    async fn clear(&self) -> Result<()> {
        let mut guard = self.entries.write().await;
        *guard = Entries::default();
        debug!(backend = BACKEND, "cleared store");
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.entries.read().await.items.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ChunkMetadata;

    fn entry(id: &str, text: &str, embedding: Vec<f32>) -> VectorStoreEntry {
        VectorStoreEntry {
            id: id.to_string(),
            text: text.to_string(),
            embedding,
            metadata: ChunkMetadata::from_source("mill.txt"),
        }
    }

    #[tokio::test]
    async fn insert_query_count_clear() {
        let store = InMemoryVectorStore::new();
        store
            .insert(&[entry("a", "coil", vec![1.0, 0.0]), entry("b", "slab", vec![0.0, 1.0])])
            .await
            .unwrap();
        assert_eq!(store.count().await.unwrap(), 2);

        let results = store.query(&[0.1, 0.9], 1).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.text, "slab");

        store.clear().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
        assert!(store.query(&[0.1, 0.9], 1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_id_overwrites_in_place() {
        let store = InMemoryVectorStore::new();
        store
            .insert(&[entry("a", "old", vec![1.0, 0.0]), entry("b", "other", vec![1.0, 0.0])])
            .await
            .unwrap();
        store.insert(&[entry("a", "new", vec![1.0, 0.0])]).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 2);
        let results = store.query(&[1.0, 0.0], 5).await.unwrap();
        // Equal scores: "a" kept its original position ahead of "b".
        assert_eq!(results[0].chunk.id, "a");
        assert_eq!(results[0].chunk.text, "new");
    }

    #[tokio::test]
    async fn dimension_mismatch_is_rejected() {
        let store = InMemoryVectorStore::with_dimensions(3);
        let err = store.insert(&[entry("a", "coil", vec![1.0, 0.0])]).await.unwrap_err();
        assert!(matches!(err, RagError::VectorStoreError { .. }));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn separate_instances_do_not_share_data() {
        let first = InMemoryVectorStore::new();
        let second = InMemoryVectorStore::new();
        first.insert(&[entry("a", "coil", vec![1.0])]).await.unwrap();
        assert_eq!(second.count().await.unwrap(), 0);
    }
}
