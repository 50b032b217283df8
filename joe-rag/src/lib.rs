//! Document indexing and similarity retrieval for the Joe steel-industry
//! assistant.
//!
//! This crate provides:
//! - Sentence-aware overlapping chunking ([`chunk_text`], [`SentenceChunker`])
//! - A failure-tolerant embedding client ([`Embedder`]) over any
//!   [`EmbeddingProvider`]
//! - A [`VectorStore`] capability with in-memory and Pinecone backends, and a
//!   [`FallbackVectorStore`] that degrades from one to the other
//! - Cosine-similarity ranking ([`rank`])
//! - A best-effort [`Retriever`] for grounding context

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod fallback;
pub mod inmemory;
#[cfg(feature = "openai")]
pub mod openai;
#[cfg(feature = "pinecone")]
pub mod pinecone;
pub mod retrieval;
pub mod similarity;
pub mod vectorstore;

pub use chunking::{Chunker, SentenceChunker, chunk_spans, chunk_text};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{ChunkMetadata, Document, DocumentChunk, SearchResult, VectorStoreEntry};
pub use embedding::{Embedder, EmbeddingProvider};
pub use error::{RagError, Result};
pub use fallback::{FallbackVectorStore, StoreCounts};
pub use inmemory::InMemoryVectorStore;
#[cfg(feature = "openai")]
pub use openai::OpenAIEmbeddingProvider;
#[cfg(feature = "pinecone")]
pub use pinecone::{PineconeVectorStore, ReadinessPolicy};
pub use retrieval::Retriever;
pub use similarity::{cosine_similarity, rank};
pub use vectorstore::VectorStore;
