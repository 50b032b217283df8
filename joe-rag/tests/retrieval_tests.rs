//! End-to-end chunk, embed, store and retrieve tests.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use common::HashEmbedder;
use joe_rag::chunking::{Chunker, SentenceChunker};
use joe_rag::document::Document;
use joe_rag::embedding::{Embedder, EmbeddingProvider};
use joe_rag::error::{RagError, Result};
use joe_rag::inmemory::InMemoryVectorStore;
use joe_rag::retrieval::Retriever;
use joe_rag::vectorstore::VectorStore;

/// Unpunctuated text of unique tokens, exactly `len` characters long.
fn token_text(len: usize) -> String {
    let text: String = (0..len).map(|i| format!("w{i} ")).collect();
    text.chars().take(len).collect()
}

struct CountingProvider {
    calls: AtomicUsize,
    fail: bool,
}

#[async_trait]
impl EmbeddingProvider for CountingProvider {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(RagError::EmbeddingError {
                provider: "counting".into(),
                message: "503 Service Unavailable".into(),
            });
        }
        Ok(vec![1.0, 0.0])
    }

    fn dimensions(&self) -> usize {
        2
    }
}

#[tokio::test]
async fn indexed_chunk_is_retrieved_first() {
    let document = Document::new("doc-1700000000000-0", "plate-mill.txt", token_text(2500));
    let chunks = SentenceChunker::new(1000, 200).unwrap().chunk(&document);
    assert_eq!(chunks.len(), 4);

    let embedder = Embedder::new(Arc::new(HashEmbedder::new(256)));
    let store = Arc::new(InMemoryVectorStore::new());
    let query = chunks[2].text.clone();
    store.insert(&embedder.embed_chunks(chunks).await.unwrap()).await.unwrap();
    assert_eq!(store.count().await.unwrap(), 4);

    let retriever = Retriever::new(embedder, store);
    let results = retriever.retrieve_scored(&query, 3).await;
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].chunk.id, "doc-1700000000000-0-chunk-2");
    assert_eq!(results[0].chunk.metadata.source, "plate-mill.txt");
    assert_eq!(results[0].chunk.metadata.section.as_deref(), Some("Chunk 3"));
    let top = results[0].score.unwrap();
    assert!((top - 1.0).abs() < 1e-4, "top score {top}");
}

#[tokio::test]
async fn empty_store_returns_nothing_without_embedding() {
    let provider = Arc::new(CountingProvider { calls: AtomicUsize::new(0), fail: false });
    let retriever =
        Retriever::new(Embedder::new(provider.clone()), Arc::new(InMemoryVectorStore::new()));

    assert!(retriever.retrieve("hot rolled coil price").await.is_empty());
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn embedding_failure_returns_nothing() {
    let provider = Arc::new(CountingProvider { calls: AtomicUsize::new(0), fail: true });
    let store = Arc::new(InMemoryVectorStore::new());
    store.insert(&[common::entry("doc-1-chunk-0", "billet", vec![1.0, 0.0])]).await.unwrap();

    let retriever = Retriever::new(Embedder::new(provider.clone()), store);
    assert!(retriever.retrieve("billet stock").await.is_empty());
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

    let err = retriever.try_retrieve("billet stock", 3).await.unwrap_err();
    assert!(matches!(err, RagError::PipelineError(_)), "{err}");
}

#[tokio::test]
async fn blank_query_makes_no_requests() {
    let provider = Arc::new(CountingProvider { calls: AtomicUsize::new(0), fail: false });
    let retriever =
        Retriever::new(Embedder::new(provider.clone()), Arc::new(InMemoryVectorStore::new()));

    assert!(retriever.retrieve("   \n").await.is_empty());
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn top_k_defaults_to_three() {
    let store = Arc::new(InMemoryVectorStore::new());
    let entries: Vec<_> = (0..5)
        .map(|i| common::entry(&format!("doc-1-chunk-{i}"), "scrap", vec![1.0, i as f32]))
        .collect();
    store.insert(&entries).await.unwrap();

    let provider = Arc::new(CountingProvider { calls: AtomicUsize::new(0), fail: false });
    let retriever = Retriever::new(Embedder::new(provider), store);
    let chunks = retriever.retrieve("scrap").await;
    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks[0].id, "doc-1-chunk-0");
}
