//! Configuration for chunking, embedding and retrieval.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::chunking::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::error::{RagError, Result};

/// Largest number of vectors the remote index accepts per upsert call.
pub const MAX_REMOTE_BATCH_SIZE: usize = 100;

/// Configuration parameters for the knowledge-base pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// Number of chunks retrieved per query.
    pub top_k: usize,
    /// Pause between consecutive embedding requests, in milliseconds.
    pub embed_delay_ms: u64,
    /// Vectors per remote upsert call.
    pub remote_batch_size: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            top_k: 3,
            embed_delay_ms: 200,
            remote_batch_size: MAX_REMOTE_BATCH_SIZE,
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// The embedding delay as a [`Duration`].
    pub fn embed_delay(&self) -> Duration {
        Duration::from_millis(self.embed_delay_ms)
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the number of chunks retrieved per query.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the pause between embedding requests. Zero disables it.
    pub fn embed_delay(mut self, delay: Duration) -> Self {
        self.config.embed_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the number of vectors per remote upsert call.
    pub fn remote_batch_size(mut self, size: usize) -> Self {
        self.config.remote_batch_size = size;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `chunk_size == 0` or `chunk_overlap >= chunk_size`
    /// - `top_k == 0`
    /// - `remote_batch_size` is zero or above [`MAX_REMOTE_BATCH_SIZE`]
    pub fn build(self) -> Result<RagConfig> {
        let config = self.config;
        if config.chunk_size == 0 {
            return Err(RagError::ConfigError("chunk_size must be greater than zero".to_string()));
        }
        if config.chunk_overlap >= config.chunk_size {
            return Err(RagError::ConfigError(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                config.chunk_overlap, config.chunk_size
            )));
        }
        if config.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }
        if config.remote_batch_size == 0 || config.remote_batch_size > MAX_REMOTE_BATCH_SIZE {
            return Err(RagError::ConfigError(format!(
                "remote_batch_size must be between 1 and {MAX_REMOTE_BATCH_SIZE}, got {}",
                config.remote_batch_size
            )));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_upload_behaviour() {
        let config = RagConfig::default();
        assert_eq!(config.chunk_size, 1000);
        assert_eq!(config.chunk_overlap, 200);
        assert_eq!(config.top_k, 3);
        assert_eq!(config.embed_delay(), Duration::from_millis(200));
        assert_eq!(config.remote_batch_size, 100);
    }

    #[test]
    fn builder_validates() {
        assert!(RagConfig::builder().chunk_size(100).chunk_overlap(100).build().is_err());
        assert!(RagConfig::builder().top_k(0).build().is_err());
        assert!(RagConfig::builder().remote_batch_size(101).build().is_err());
        assert!(RagConfig::builder().remote_batch_size(0).build().is_err());

        let config = RagConfig::builder()
            .chunk_size(500)
            .chunk_overlap(50)
            .top_k(5)
            .embed_delay(Duration::ZERO)
            .build()
            .unwrap();
        assert_eq!(config.embed_delay_ms, 0);
        assert_eq!(config.top_k, 5);
    }
}
