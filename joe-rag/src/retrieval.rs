//! Best-effort retrieval of grounding context.
//!
//! The [`Retriever`] embeds a query, asks the active [`VectorStore`] for the
//! closest chunks, and returns them. Retrieval augments a reply but is never
//! required for one, so every failure is logged and turned into an empty
//! result.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::document::{DocumentChunk, SearchResult};
use crate::embedding::Embedder;
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

/// Number of chunks returned when no explicit `top_k` is given.
pub const DEFAULT_TOP_K: usize = 3;

/// Embeds queries and searches a vector store.
///
/// # Example
///
/// ```rust,ignore
/// use joe_rag::{Embedder, InMemoryVectorStore, Retriever};
///
/// let retriever = Retriever::new(embedder, Arc::new(InMemoryVectorStore::new()));
/// let chunks = retriever.retrieve("What is the lead time on rebar?").await;
/// ```
#[derive(Clone)]
pub struct Retriever {
    embedder: Embedder,
    store: Arc<dyn VectorStore>,
    top_k: usize,
}

impl Retriever {
    /// Create a retriever returning [`DEFAULT_TOP_K`] chunks per query.
    pub fn new(embedder: Embedder, store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, store, top_k: DEFAULT_TOP_K }
    }

    /// Set the default number of chunks per query.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    /// Retrieve the default number of chunks for `query`.
    ///
    /// Never fails: any embedding or store error yields an empty `Vec`.
    pub async fn retrieve(&self, query: &str) -> Vec<DocumentChunk> {
        self.retrieve_top_k(query, self.top_k).await
    }

    /// Retrieve up to `top_k` chunks for `query`.
    pub async fn retrieve_top_k(&self, query: &str, top_k: usize) -> Vec<DocumentChunk> {
        self.retrieve_scored(query, top_k).await.into_iter().map(|r| r.chunk).collect()
    }

    /// Retrieve up to `top_k` chunks for `query` together with their scores.
    pub async fn retrieve_scored(&self, query: &str, top_k: usize) -> Vec<SearchResult> {
        match self.try_retrieve(query, top_k).await {
            Ok(results) => results,
            Err(e) => {
                warn!(error = %e, "retrieval failed, continuing without context");
                Vec::new()
            }
        }
    }

    /// The fallible path behind [`retrieve_scored`](Self::retrieve_scored).
    ///
    /// # Errors
    ///
    /// Returns [`RagError::PipelineError`] wrapping the embedding or store
    /// failure.
    pub async fn try_retrieve(&self, query: &str, top_k: usize) -> Result<Vec<SearchResult>> {
        if query.trim().is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }
        // Nothing to rank, so skip the embedding request. A failed count
        // falls through to the normal query path.
        if let Ok(0) = self.store.count().await {
            debug!(store = self.store.name(), "store is empty, skipping query");
            return Ok(Vec::new());
        }

        let embedding = self
            .embedder
            .embed_query(query)
            .await
            .map_err(|e| RagError::PipelineError(format!("query embedding failed: {e}")))?;

        let results = self.store.query(&embedding, top_k).await.map_err(|e| {
            RagError::PipelineError(format!("search failed in {}: {e}", self.store.name()))
        })?;

        debug!(store = self.store.name(), result_count = results.len(), "query completed");
        Ok(results)
    }
}

impl std::fmt::Debug for Retriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retriever")
            .field("embedder", &self.embedder)
            .field("store", &self.store.name())
            .field("top_k", &self.top_k)
            .finish()
    }
}
