//! Embedding providers and the failure-tolerant batch embedder.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::document::{DocumentChunk, VectorStoreEntry};
use crate::error::{RagError, Result};

/// A provider that generates vector embeddings from text input.
///
/// Implementations wrap a specific embedding backend behind a unified async
/// interface.
///
/// # Example
///
/// ```rust,ignore
/// use joe_rag::EmbeddingProvider;
///
/// let provider = MyEmbeddingProvider::new();
/// let embedding = provider.embed("hello world").await?;
/// assert_eq!(embedding.len(), provider.dimensions());
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Return the dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;

    /// Short provider name used in logs and errors.
    fn name(&self) -> &str {
        "embedding"
    }

    /// Check that the provider is usable before any request is made.
    ///
    /// The default accepts everything; providers with credentials override
    /// this to reject missing keys up front.
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// Embeds batches one text at a time, keeping output aligned with input.
///
/// A failure on any single text is logged and replaced by a zero vector of
/// the provider's dimension, so `output[i]` always belongs to `input[i]`.
/// Only [`EmbeddingProvider::validate`] failures abort a batch, and they do
/// so before the first request.
#[derive(Clone)]
pub struct Embedder {
    provider: Arc<dyn EmbeddingProvider>,
    delay: Duration,
}

impl Embedder {
    /// Create an embedder with no pause between requests.
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { provider, delay: Duration::ZERO }
    }

    /// Pause for `delay` between consecutive requests to stay under upstream
    /// rate limits.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// The wrapped provider.
    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    /// Dimension of every vector this embedder returns.
    pub fn dimensions(&self) -> usize {
        self.provider.dimensions()
    }

    /// Embed a single query text, propagating any failure.
    ///
    /// Unlike [`embed`](Self::embed) there is no zero-vector substitution: a
    /// zero query vector matches nothing.
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.provider.validate()?;
        let vector = self.provider.embed(text).await?;
        self.check_dimensions(&vector)?;
        Ok(vector)
    }

    /// Embed every text in order, returning one vector per input.
    ///
    /// # Errors
    ///
    /// Returns the provider's validation error when credentials are missing
    /// or invalid. Per-text request failures never produce an error.
    pub async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.provider.validate()?;

        let mut vectors = Vec::with_capacity(texts.len());
        let mut failures = 0usize;
        for (index, text) in texts.iter().enumerate() {
            if index > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            let result = match self.provider.embed(text).await {
                Ok(vector) => self.check_dimensions(&vector).map(|()| vector),
                Err(e) => Err(e),
            };
            let vector = result.unwrap_or_else(|e| {
                warn!(provider = self.provider.name(), index, error = %e, "substituting zero vector");
                failures += 1;
                self.zero_vector()
            });
            vectors.push(vector);
        }

        debug!(provider = self.provider.name(), count = texts.len(), failures, "embedded batch");
        Ok(vectors)
    }

    /// Embed chunks and pair each one with its vector.
    ///
    /// # Errors
    ///
    /// Same as [`embed`](Self::embed).
    pub async fn embed_chunks(&self, chunks: Vec<DocumentChunk>) -> Result<Vec<VectorStoreEntry>> {
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let vectors = self.embed(&texts).await?;
        VectorStoreEntry::pair(chunks, vectors)
    }

    fn zero_vector(&self) -> Vec<f32> {
        vec![0.0; self.provider.dimensions()]
    }

    fn check_dimensions(&self, vector: &[f32]) -> Result<()> {
        let expected = self.provider.dimensions();
        if vector.len() != expected {
            return Err(RagError::EmbeddingError {
                provider: self.provider.name().to_string(),
                message: format!("expected {expected} dimensions, got {}", vector.len()),
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for Embedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Embedder")
            .field("provider", &self.provider.name())
            .field("dimensions", &self.provider.dimensions())
            .field("delay", &self.delay)
            .finish()
    }
}
