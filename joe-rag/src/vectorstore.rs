//! Vector store trait for storing and searching chunk embeddings.

use async_trait::async_trait;

use crate::document::{SearchResult, VectorStoreEntry};
use crate::error::Result;

/// A storage backend for embedded chunks with similarity search.
///
/// Every backend holds one knowledge base: entries are inserted, searched
/// by vector, counted, and removed only all at once.
///
/// # Example
///
/// ```rust,ignore
/// use joe_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.insert(&entries).await?;
/// let results = store.query(&query_embedding, 3).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Short backend name used in logs and errors.
    fn name(&self) -> &str;

    /// Store entries. An entry whose id already exists replaces it.
    async fn insert(&self, entries: &[VectorStoreEntry]) -> Result<()>;

    /// Return up to `top_k` entries ordered by descending similarity.
    async fn query(&self, embedding: &[f32], top_k: usize) -> Result<Vec<SearchResult>>;

    /// Remove every entry.
    async fn clear(&self) -> Result<()>;

    /// Number of stored entries.
    async fn count(&self) -> Result<usize>;
}
