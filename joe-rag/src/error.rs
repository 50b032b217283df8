//! Error types for the `joe-rag` crate.

use thiserror::Error;

/// Errors that can occur in RAG operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStoreError {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// The remote index the store writes to does not exist.
    #[error("Index '{0}' does not exist")]
    IndexMissing(String),

    /// The remote index was created but never reported ready.
    #[error("Index '{index}' not ready after {attempts} readiness checks")]
    IndexNotReady {
        /// The index that was polled.
        index: String,
        /// How many times readiness was checked before giving up.
        attempts: u32,
    },

    /// A batched insert failed after some entries were already persisted.
    ///
    /// `stored` is the number of leading entries of the insert call that
    /// reached the backend; everything from that offset on was not written.
    #[error("Insert stopped after {stored} entries: {source}")]
    PartialInsert {
        /// Number of leading entries persisted before the failure.
        stored: usize,
        /// The failure that stopped the insert.
        #[source]
        source: Box<RagError>,
    },

    /// An error occurred during document chunking.
    #[error("Chunking error: {0}")]
    ChunkingError(String),

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An error in the retrieval orchestration.
    #[error("Pipeline error: {0}")]
    PipelineError(String),
}

impl RagError {
    pub(crate) fn store(backend: &str, message: impl Into<String>) -> Self {
        Self::VectorStoreError { backend: backend.to_string(), message: message.into() }
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
