//! Data types for documents, chunks, stored entries and search results.

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// An uploaded source document before chunking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier for the document, e.g. `doc-1718000000000-0`.
    pub id: String,
    /// Origin file name, copied into every chunk's metadata.
    pub source: String,
    /// The raw text content of the document.
    pub text: String,
}

impl Document {
    /// Create a new document.
    pub fn new(id: impl Into<String>, source: impl Into<String>, text: impl Into<String>) -> Self {
        Self { id: id.into(), source: source.into(), text: text.into() }
    }
}

/// Provenance metadata attached to every chunk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkMetadata {
    /// Origin file name.
    pub source: String,
    /// Human-readable label such as `Chunk 3`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    /// Page number, when the source format has pages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

impl ChunkMetadata {
    /// Metadata naming only the source file.
    pub fn from_source(source: impl Into<String>) -> Self {
        Self { source: source.into(), section: None, page: None }
    }

    /// Attach a section label.
    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    /// Attach a page number.
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }
}

/// A contiguous segment of a [`Document`], the unit of embedding and retrieval.
///
/// Chunk ids have the form `<document-id>-chunk-<index>`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentChunk {
    /// Unique identifier for the chunk.
    pub id: String,
    /// The literal text of the chunk.
    pub text: String,
    /// Provenance metadata.
    pub metadata: ChunkMetadata,
}

impl DocumentChunk {
    /// Build the id of chunk `index` of document `document_id`.
    pub fn chunk_id(document_id: &str, index: usize) -> String {
        format!("{document_id}-chunk-{index}")
    }
}

/// The unit of storage: a chunk paired with its embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VectorStoreEntry {
    /// The chunk id, unique within a store.
    pub id: String,
    /// The chunk text.
    pub text: String,
    /// The chunk's embedding vector.
    pub embedding: Vec<f32>,
    /// The chunk's provenance metadata.
    pub metadata: ChunkMetadata,
}

impl VectorStoreEntry {
    /// Pair a chunk with its embedding.
    pub fn new(chunk: DocumentChunk, embedding: Vec<f32>) -> Self {
        Self { id: chunk.id, text: chunk.text, embedding, metadata: chunk.metadata }
    }

    /// Pair chunks with vectors position by position.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::PipelineError`] when the two sequences differ in length.
    pub fn pair(chunks: Vec<DocumentChunk>, vectors: Vec<Vec<f32>>) -> Result<Vec<Self>> {
        if chunks.len() != vectors.len() {
            return Err(RagError::PipelineError(format!(
                "cannot pair {} chunks with {} embeddings",
                chunks.len(),
                vectors.len()
            )));
        }
        Ok(chunks.into_iter().zip(vectors).map(|(chunk, vector)| Self::new(chunk, vector)).collect())
    }

    /// Drop the embedding and return the chunk view of this entry.
    pub fn to_chunk(&self) -> DocumentChunk {
        DocumentChunk { id: self.id.clone(), text: self.text.clone(), metadata: self.metadata.clone() }
    }
}

/// A retrieved [`DocumentChunk`] paired with its similarity score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    /// The retrieved chunk, without its embedding.
    pub chunk: DocumentChunk,
    /// Cosine similarity to the query, or `None` when it is undefined
    /// (for example a zero vector left by a failed embedding).
    pub score: Option<f32>,
}
