//! Primary/fallback composition of two vector stores.
//!
//! [`FallbackVectorStore`] sends every operation to a primary store (usually
//! a remote index) and degrades to a fallback store (usually in-memory) when
//! the primary fails. Data is never migrated between the two: entries that
//! reached the primary before a failure stay there, the rest go to the
//! fallback, and the two sides are counted separately.

use async_trait::async_trait;
use tracing::{error, warn};

use crate::document::{SearchResult, VectorStoreEntry};
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

/// Entry counts of both sides of a [`FallbackVectorStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreCounts {
    /// Entries in the primary store, or `None` if it could not be counted.
    pub primary: Option<usize>,
    /// Entries in the fallback store.
    pub fallback: usize,
}

impl StoreCounts {
    /// Sum of both sides, treating an uncountable primary as empty.
    pub fn total(&self) -> usize {
        self.primary.unwrap_or(0) + self.fallback
    }
}

/// A [`VectorStore`] that retries failed primary operations on a fallback.
///
/// | operation | primary fails with | behaviour |
/// |-----------|--------------------|-----------|
/// | `insert`  | `PartialInsert { stored }` | `entries[stored..]` go to the fallback |
/// | `insert`  | anything else | all entries go to the fallback |
/// | `query`   | anything | fallback answers |
/// | `clear`   | anything | fallback is still cleared |
/// | `count`   | anything | fallback count is reported |
///
/// # Example
///
/// ```rust,ignore
/// use joe_rag::{FallbackVectorStore, InMemoryVectorStore, PineconeVectorStore};
///
/// let store = FallbackVectorStore::new(
///     PineconeVectorStore::new(api_key, environment, 1536)?,
///     InMemoryVectorStore::with_dimensions(1536),
/// );
/// ```
#[derive(Debug)]
pub struct FallbackVectorStore<P, F> {
    primary: P,
    fallback: F,
}

impl<P: VectorStore, F: VectorStore> FallbackVectorStore<P, F> {
    /// Compose `primary` with `fallback`.
    pub fn new(primary: P, fallback: F) -> Self {
        Self { primary, fallback }
    }

    /// The primary store.
    pub fn primary(&self) -> &P {
        &self.primary
    }

    /// The fallback store.
    pub fn fallback(&self) -> &F {
        &self.fallback
    }

    /// Count both sides separately.
    ///
    /// # Errors
    ///
    /// Only a failure of the fallback store is returned.
    pub async fn counts(&self) -> Result<StoreCounts> {
        let primary = match self.primary.count().await {
            Ok(count) => Some(count),
            Err(e) => {
                warn!(primary = self.primary.name(), error = %e, "primary count unavailable");
                None
            }
        };
        Ok(StoreCounts { primary, fallback: self.fallback.count().await? })
    }

    fn degrade(&self, op: &str, error: &RagError) {
        warn!(
            primary = self.primary.name(),
            fallback = self.fallback.name(),
            op,
            error = %error,
            "primary store failed, using fallback"
        );
    }
}

#[async_trait]
impl<P: VectorStore, F: VectorStore> VectorStore for FallbackVectorStore<P, F> {
    fn name(&self) -> &str {
        "Fallback"
    }

    async fn insert(&self, entries: &[VectorStoreEntry]) -> Result<()> {
        match self.primary.insert(entries).await {
            Ok(()) => Ok(()),
            Err(RagError::PartialInsert { stored, source }) => {
                self.degrade("insert", &source);
                self.fallback.insert(&entries[stored.min(entries.len())..]).await
            }
            Err(e) => {
                self.degrade("insert", &e);
                self.fallback.insert(entries).await
            }
        }
    }

    async fn query(&self, embedding: &[f32], top_k: usize) -> Result<Vec<SearchResult>> {
        match self.primary.query(embedding, top_k).await {
            Ok(results) => Ok(results),
            Err(e) => {
                self.degrade("query", &e);
                self.fallback.query(embedding, top_k).await
            }
        }
    }

    async fn clear(&self) -> Result<()> {
        let primary = self.primary.clear().await;
        if let Err(e) = &primary {
            self.degrade("clear", e);
        }
        match self.fallback.clear().await {
            Ok(()) => Ok(()),
            Err(fallback_error) => {
                error!(
                    fallback = self.fallback.name(),
                    error = %fallback_error,
                    "fallback clear failed"
                );
                // The primary's error wins when both sides failed.
                primary.and(Err(fallback_error))
            }
        }
    }

    async fn count(&self) -> Result<usize> {
        match self.primary.count().await {
            Ok(count) => Ok(count),
            Err(e) => {
                self.degrade("count", &e);
                self.fallback.count().await
            }
        }
    }
}
