//! The assistant's knowledge base: backend selection, uploads and retrieval.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use joe_rag::{
    Chunker, Document, DocumentChunk, Embedder, FallbackVectorStore, InMemoryVectorStore,
    OpenAIEmbeddingProvider, PineconeVectorStore, RagConfig, Retriever, SentenceChunker,
    VectorStore,
};
use tracing::{info, warn};

use crate::error::{AssistantError, Result, UploadError};
use crate::settings::Settings;

/// Outcome of a multi-file upload.
#[derive(Debug, Default)]
pub struct UploadReport {
    /// Files that were indexed, with the number of chunks each produced.
    pub indexed: Vec<(String, usize)>,
    /// Files that were skipped, with the reason.
    pub failed: Vec<(String, UploadError)>,
}

impl UploadReport {
    /// Chunks added across all indexed files.
    pub fn total_chunks(&self) -> usize {
        self.indexed.iter().map(|(_, chunks)| chunks).sum()
    }
}

/// Chunks, embeds and stores documents, and retrieves grounding context.
#[derive(Clone)]
pub struct KnowledgeBase {
    chunker: SentenceChunker,
    embedder: Embedder,
    store: Arc<dyn VectorStore>,
    retriever: Retriever,
    next_document: Arc<AtomicU64>,
}

impl KnowledgeBase {
    /// Assemble a knowledge base from its parts.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` carries invalid chunking parameters.
    pub fn new(embedder: Embedder, store: Arc<dyn VectorStore>, config: &RagConfig) -> Result<Self> {
        let chunker = SentenceChunker::new(config.chunk_size, config.chunk_overlap)?;
        let retriever = Retriever::new(embedder.clone(), store.clone()).with_top_k(config.top_k);
        let next_document = Arc::new(AtomicU64::new(0));
        Ok(Self { chunker, embedder, store, retriever, next_document })
    }

    /// Build the knowledge base the settings describe.
    ///
    /// The remote index is used, backed by process memory, when both remote
    /// credentials are present. Otherwise everything stays in memory. The
    /// choice is made once; nothing is migrated between backends.
    ///
    /// # Errors
    ///
    /// Returns [`AssistantError::MissingSetting`] without an OpenAI key.
    pub fn from_settings(settings: &Settings, config: &RagConfig) -> Result<Self> {
        let key = settings.openai_key().ok_or(AssistantError::MissingSetting("openai_api_key"))?;
        let provider = OpenAIEmbeddingProvider::new(key)?;
        let dimensions = joe_rag::EmbeddingProvider::dimensions(&provider);
        let embedder = Embedder::new(Arc::new(provider)).with_delay(config.embed_delay());
        let memory = InMemoryVectorStore::with_dimensions(dimensions);

        let store: Arc<dyn VectorStore> = match settings.pinecone() {
            Some((api_key, environment)) => {
                let remote = PineconeVectorStore::new(api_key, environment, dimensions)?
                    .with_batch_size(config.remote_batch_size);
                info!(index = remote.index_name(), namespace = remote.namespace(), "using remote index");
                Arc::new(FallbackVectorStore::new(remote, memory))
            }
            None => {
                info!("using in-memory store");
                Arc::new(memory)
            }
        };

        Self::new(embedder, store, config)
    }

    /// Name of the active backend.
    pub fn backend(&self) -> &str {
        self.store.name()
    }

    /// Index `text` under `file_name`.
    ///
    /// Returns the number of chunks stored.
    ///
    /// # Errors
    ///
    /// Rejects non-`.txt` names, and propagates credential and store errors.
    pub async fn upload_text(
        &self,
        file_name: &str,
        text: &str,
    ) -> std::result::Result<usize, UploadError> {
        ensure_text_file(file_name)?;
        self.index(Document::new(self.document_id(), file_name, text)).await
    }

    /// Index every file in `paths`, continuing past files that fail.
    ///
    /// # Errors
    ///
    /// Fails before reading anything if the embedding credential is unusable.
    pub async fn upload_files(&self, paths: &[PathBuf]) -> Result<UploadReport> {
        self.embedder.provider().validate()?;

        let mut report = UploadReport::default();
        for path in paths {
            let name = file_name(path);
            match self.upload_file(path, &name).await {
                Ok(chunks) => {
                    info!(file = %name, chunks, "indexed file");
                    report.indexed.push((name, chunks));
                }
                Err(e) => {
                    warn!(file = %name, error = %e, "skipping file");
                    report.failed.push((name, e));
                }
            }
        }
        Ok(report)
    }

    /// Number of chunks in the active backend.
    pub async fn document_count(&self) -> Result<usize> {
        Ok(self.store.count().await?)
    }

    /// Remove every chunk.
    pub async fn clear(&self) -> Result<()> {
        self.store.clear().await?;
        info!(backend = self.store.name(), "knowledge base cleared");
        Ok(())
    }

    /// Chunks most relevant to `query`; empty when nothing could be found.
    pub async fn retrieve(&self, query: &str) -> Vec<DocumentChunk> {
        self.retriever.retrieve(query).await
    }

    async fn upload_file(
        &self,
        path: &Path,
        name: &str,
    ) -> std::result::Result<usize, UploadError> {
        ensure_text_file(name)?;
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| UploadError::Read { name: name.to_string(), source })?;
        self.index(Document::new(self.document_id(), name, text)).await
    }

    /// `doc-<unix-millis>-<n>`, where `n` counts documents indexed by this
    /// knowledge base and its clones.
    fn document_id(&self) -> String {
        let sequence = self.next_document.fetch_add(1, Ordering::Relaxed);
        format!("doc-{}-{sequence}", chrono::Utc::now().timestamp_millis())
    }

    async fn index(&self, document: Document) -> std::result::Result<usize, UploadError> {
        let chunks = self.chunker.chunk(&document);
        if chunks.is_empty() {
            return Ok(0);
        }
        let count = chunks.len();
        let entries = self.embedder.embed_chunks(chunks).await?;
        self.store.insert(&entries).await?;
        Ok(count)
    }
}

impl std::fmt::Debug for KnowledgeBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeBase")
            .field("chunker", &self.chunker)
            .field("embedder", &self.embedder)
            .field("store", &self.store.name())
            .finish()
    }
}

fn ensure_text_file(name: &str) -> std::result::Result<(), UploadError> {
    let is_text = Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"));
    if is_text { Ok(()) } else { Err(UploadError::UnsupportedFile(name.to_string())) }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
