//! Pinecone vector store backend.
//!
//! Provides [`PineconeVectorStore`] which implements [`VectorStore`] against
//! the Pinecone REST API using `reqwest`. Every operation targets one fixed
//! index and one fixed namespace; the index is created lazily on the first
//! insert and the store waits, with a bounded backoff, until it is ready.
//!
//! This module is only available when the `pinecone` feature is enabled.
//!
//! # Example
//!
//! ```rust,ignore
//! use joe_rag::pinecone::PineconeVectorStore;
//!
//! let store = PineconeVectorStore::new("pc-...", "us-east-1", 1536)?;
//! store.insert(&entries).await?;
//! let results = store.query(&query_embedding, 3).await?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::MAX_REMOTE_BATCH_SIZE;
use crate::document::{ChunkMetadata, DocumentChunk, SearchResult, VectorStoreEntry};
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

/// The Pinecone control-plane endpoint.
pub const PINECONE_CONTROL_PLANE: &str = "https://api.pinecone.io";

/// Index holding the assistant's knowledge base.
pub const DEFAULT_INDEX_NAME: &str = "joe-knowledge-base";

/// Namespace holding the assistant's knowledge base inside the index.
pub const DEFAULT_NAMESPACE: &str = "steel-industry";

const BACKEND: &str = "Pinecone";
const API_VERSION: &str = "2024-07";

/// How long to wait for a freshly created index to become ready.
///
/// The wait before attempt `n` is `initial_interval * 2^n`, capped at
/// `max_interval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessPolicy {
    /// Number of readiness checks before giving up.
    pub max_attempts: u32,
    /// Wait after the first unsuccessful check.
    pub initial_interval: Duration,
    /// Upper bound for a single wait.
    pub max_interval: Duration,
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(10),
        }
    }
}

impl ReadinessPolicy {
    /// Wait to apply after unsuccessful check number `attempt` (0-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.initial_interval.saturating_mul(factor).min(self.max_interval)
    }
}

/// A [`VectorStore`] backed by a [Pinecone](https://www.pinecone.io/) index.
///
/// Chunk text and metadata travel in each vector's metadata so that query
/// results can be turned back into [`DocumentChunk`]s.
pub struct PineconeVectorStore {
    client: reqwest::Client,
    api_key: String,
    environment: String,
    cloud: String,
    control_plane: String,
    index_name: String,
    namespace: String,
    dimensions: usize,
    batch_size: usize,
    readiness: ReadinessPolicy,
    host: Mutex<Option<String>>,
}

impl PineconeVectorStore {
    /// Create a store for the default index and namespace.
    ///
    /// `environment` is the region the serverless index lives in.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if the key or environment is empty or
    /// `dimensions` is zero.
    pub fn new(
        api_key: impl Into<String>,
        environment: impl Into<String>,
        dimensions: usize,
    ) -> Result<Self> {
        let api_key = api_key.into();
        let environment = environment.into();
        if api_key.trim().is_empty() {
            return Err(RagError::ConfigError("Pinecone API key must not be empty".into()));
        }
        if environment.trim().is_empty() {
            return Err(RagError::ConfigError("Pinecone environment must not be empty".into()));
        }
        if dimensions == 0 {
            return Err(RagError::ConfigError("index dimensions must be greater than zero".into()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            environment,
            cloud: "aws".into(),
            control_plane: PINECONE_CONTROL_PLANE.into(),
            index_name: DEFAULT_INDEX_NAME.into(),
            namespace: DEFAULT_NAMESPACE.into(),
            dimensions,
            batch_size: MAX_REMOTE_BATCH_SIZE,
            readiness: ReadinessPolicy::default(),
            host: Mutex::new(None),
        })
    }

    /// Use a different control-plane URL (e.g. a local emulator).
    pub fn with_control_plane(mut self, url: impl Into<String>) -> Self {
        self.control_plane = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Use a different index name.
    pub fn with_index_name(mut self, name: impl Into<String>) -> Self {
        self.index_name = name.into();
        self
    }

    /// Use a different namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Use a different cloud provider for index creation.
    pub fn with_cloud(mut self, cloud: impl Into<String>) -> Self {
        self.cloud = cloud.into();
        self
    }

    /// Set the number of vectors per upsert call, clamped to `1..=100`.
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.clamp(1, MAX_REMOTE_BATCH_SIZE);
        self
    }

    /// Set the readiness polling policy.
    pub fn with_readiness(mut self, readiness: ReadinessPolicy) -> Self {
        self.readiness = readiness;
        self
    }

    /// The index this store writes to.
    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// The namespace this store writes to.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn map_err(e: reqwest::Error) -> RagError {
        RagError::store(BACKEND, e.to_string())
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
    }

    async fn expect_success(response: reqwest::Response, op: &str) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(RagError::store(BACKEND, format!("{op} returned {status}: {body}")))
    }

    fn data_url(host: &str, path: &str) -> String {
        if host.starts_with("http://") || host.starts_with("https://") {
            format!("{}{path}", host.trim_end_matches('/'))
        } else {
            format!("https://{host}{path}")
        }
    }

    /// Describe the index, or `None` if it does not exist.
    async fn describe_index(&self) -> Result<Option<IndexDescription>> {
        let url = format!("{}/indexes/{}", self.control_plane, self.index_name);
        let response =
            self.request(reqwest::Method::GET, url).send().await.map_err(Self::map_err)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = Self::expect_success(response, "describe_index").await?;
        response.json().await.map(Some).map_err(Self::map_err)
    }

    async fn create_index(&self) -> Result<()> {
        let body = json!({
            "name": self.index_name,
            "dimension": self.dimensions,
            "metric": "cosine",
            "spec": { "serverless": { "cloud": self.cloud, "region": self.environment } },
        });
        let url = format!("{}/indexes", self.control_plane);
        let response =
            self.request(reqwest::Method::POST, url).json(&body).send().await.map_err(Self::map_err)?;
        if response.status() == StatusCode::CONFLICT {
            debug!(index = %self.index_name, "index already exists, skipping creation");
            return Ok(());
        }
        Self::expect_success(response, "create_index").await?;
        info!(index = %self.index_name, dimensions = self.dimensions, "created index");
        Ok(())
    }

    /// Host of the index if it already exists; never creates it.
    async fn existing_host(&self) -> Result<Option<String>> {
        let mut cached = self.host.lock().await;
        if let Some(host) = cached.as_ref() {
            return Ok(Some(host.clone()));
        }
        match self.describe_index().await? {
            Some(description) if description.status.ready && !description.host.is_empty() => {
                *cached = Some(description.host.clone());
                Ok(Some(description.host))
            }
            Some(description) if !description.host.is_empty() => Ok(Some(description.host)),
            _ => Ok(None),
        }
    }

    /// Host of the index, creating it and waiting for readiness if needed.
    async fn ensure_index(&self) -> Result<String> {
        let mut cached = self.host.lock().await;
        if let Some(host) = cached.as_ref() {
            return Ok(host.clone());
        }

        match self.describe_index().await? {
            Some(description) if description.status.ready => {
                *cached = Some(description.host.clone());
                return Ok(description.host);
            }
            Some(_) => {}
            None => self.create_index().await?,
        }

        for attempt in 0..self.readiness.max_attempts {
            if let Some(description) = self.describe_index().await? {
                if description.status.ready {
                    info!(index = %self.index_name, attempt, "index ready");
                    *cached = Some(description.host.clone());
                    return Ok(description.host);
                }
                debug!(index = %self.index_name, attempt, state = ?description.status.state, "index not ready");
            }
            tokio::time::sleep(self.readiness.delay(attempt)).await;
        }

        warn!(index = %self.index_name, attempts = self.readiness.max_attempts, "index never became ready");
        Err(RagError::IndexNotReady {
            index: self.index_name.clone(),
            attempts: self.readiness.max_attempts,
        })
    }

    async fn upsert_batch(&self, host: &str, batch: &[VectorStoreEntry]) -> Result<()> {
        let vectors: Vec<UpsertVector<'_>> = batch
            .iter()
            .map(|entry| UpsertVector {
                id: &entry.id,
                values: &entry.embedding,
                metadata: StoredMetadata {
                    text: &entry.text,
                    source: &entry.metadata.source,
                    section: entry.metadata.section.as_deref(),
                    page: entry.metadata.page,
                },
            })
            .collect();
        let body = UpsertRequest { vectors, namespace: &self.namespace };

        let response = self
            .request(reqwest::Method::POST, Self::data_url(host, "/vectors/upsert"))
            .json(&body)
            .send()
            .await
            .map_err(Self::map_err)?;
        Self::expect_success(response, "upsert").await?;
        Ok(())
    }
}

impl std::fmt::Debug for PineconeVectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PineconeVectorStore")
            .field("environment", &self.environment)
            .field("index_name", &self.index_name)
            .field("namespace", &self.namespace)
            .field("dimensions", &self.dimensions)
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}

// ── Pinecone API request/response types ────────────────────────────

#[derive(Debug, Deserialize)]
struct IndexDescription {
    #[serde(default)]
    host: String,
    #[serde(default)]
    status: IndexStatus,
}

#[derive(Debug, Default, Deserialize)]
struct IndexStatus {
    #[serde(default)]
    ready: bool,
    #[serde(default)]
    state: Option<String>,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<UpsertVector<'a>>,
    namespace: &'a str,
}

#[derive(Serialize)]
struct UpsertVector<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: StoredMetadata<'a>,
}

#[derive(Serialize)]
struct StoredMetadata<'a> {
    text: &'a str,
    source: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    section: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    page: Option<u32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    namespace: &'a str,
    include_metadata: bool,
    include_values: bool,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: Option<f32>,
    #[serde(default)]
    metadata: Option<ReturnedMetadata>,
}

#[derive(Default, Deserialize)]
struct ReturnedMetadata {
    #[serde(default)]
    text: String,
    #[serde(default)]
    source: String,
    #[serde(default)]
    section: Option<String>,
    #[serde(default)]
    page: Option<f64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexStats {
    #[serde(default)]
    namespaces: std::collections::HashMap<String, NamespaceStats>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NamespaceStats {
    #[serde(default)]
    vector_count: usize,
}

// ── VectorStore implementation ─────────────────────────────────────

#[async_trait]
impl VectorStore for PineconeVectorStore {
    fn name(&self) -> &str {
        BACKEND
    }

    /// Upserts in sequential batches.
    ///
    /// If a batch fails after earlier batches succeeded, the error is a
    /// [`RagError::PartialInsert`] whose `stored` count says how many leading
    /// entries reached the index.
    async fn insert(&self, entries: &[VectorStoreEntry]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        if let Some(bad) = entries.iter().find(|e| e.embedding.len() != self.dimensions) {
            return Err(RagError::store(
                BACKEND,
                format!(
                    "entry '{}' has {} dimensions, index expects {}",
                    bad.id,
                    bad.embedding.len(),
                    self.dimensions
                ),
            ));
        }

        let host = self.ensure_index().await?;

        let mut stored = 0;
        for batch in entries.chunks(self.batch_size) {
            if let Err(e) = self.upsert_batch(&host, batch).await {
                warn!(index = %self.index_name, stored, error = %e, "upsert batch failed");
                return Err(if stored == 0 {
                    e
                } else {
                    RagError::PartialInsert { stored, source: Box::new(e) }
                });
            }
            stored += batch.len();
            debug!(index = %self.index_name, namespace = %self.namespace, stored, "upserted batch");
        }

        info!(index = %self.index_name, count = stored, "stored entries");
        Ok(())
    }

    async fn query(&self, embedding: &[f32], top_k: usize) -> Result<Vec<SearchResult>> {
        let host = self
            .existing_host()
            .await?
            .ok_or_else(|| RagError::IndexMissing(self.index_name.clone()))?;

        let body = QueryRequest {
            vector: embedding,
            top_k,
            namespace: &self.namespace,
            include_metadata: true,
            include_values: false,
        };
        let response = self
            .request(reqwest::Method::POST, Self::data_url(&host, "/query"))
            .json(&body)
            .send()
            .await
            .map_err(Self::map_err)?;
        let response: QueryResponse =
            Self::expect_success(response, "query").await?.json().await.map_err(Self::map_err)?;

        let results = response
            .matches
            .into_iter()
            .map(|m| {
                let metadata = m.metadata.unwrap_or_default();
                let mut chunk_metadata = ChunkMetadata::from_source(metadata.source);
                if let Some(section) = metadata.section {
                    chunk_metadata = chunk_metadata.with_section(section);
                }
                if let Some(page) = metadata.page {
                    chunk_metadata = chunk_metadata.with_page(page as u32);
                }
                SearchResult {
                    chunk: DocumentChunk { id: m.id, text: metadata.text, metadata: chunk_metadata },
                    score: m.score,
                }
            })
            .collect::<Vec<_>>();

        debug!(index = %self.index_name, result_count = results.len(), "query completed");
        Ok(results)
    }

    /// Deletes every vector in the namespace. The index itself is kept.
    async fn clear(&self) -> Result<()> {
        let Some(host) = self.existing_host().await? else {
            debug!(index = %self.index_name, "index missing, nothing to clear");
            return Ok(());
        };

        let body = json!({ "deleteAll": true, "namespace": self.namespace });
        let response = self
            .request(reqwest::Method::POST, Self::data_url(&host, "/vectors/delete"))
            .json(&body)
            .send()
            .await
            .map_err(Self::map_err)?;
        // An empty namespace reports 404; there is nothing to delete.
        if response.status() != StatusCode::NOT_FOUND {
            Self::expect_success(response, "delete").await?;
        }
        info!(index = %self.index_name, namespace = %self.namespace, "cleared namespace");
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        let host = self
            .existing_host()
            .await?
            .ok_or_else(|| RagError::IndexMissing(self.index_name.clone()))?;

        let response = self
            .request(reqwest::Method::POST, Self::data_url(&host, "/describe_index_stats"))
            .json(&json!({}))
            .send()
            .await
            .map_err(Self::map_err)?;
        let stats: IndexStats = Self::expect_success(response, "describe_index_stats")
            .await?
            .json()
            .await
            .map_err(Self::map_err)?;

        Ok(stats.namespaces.get(&self.namespace).map(|ns| ns.vector_count).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readiness_backoff_doubles_and_caps() {
        let policy = ReadinessPolicy {
            max_attempts: 10,
            initial_interval: Duration::from_millis(100),
            max_interval: Duration::from_millis(500),
        };
        assert_eq!(policy.delay(0), Duration::from_millis(100));
        assert_eq!(policy.delay(1), Duration::from_millis(200));
        assert_eq!(policy.delay(2), Duration::from_millis(400));
        assert_eq!(policy.delay(3), Duration::from_millis(500));
        assert_eq!(policy.delay(40), Duration::from_millis(500));
    }

    #[test]
    fn requires_credentials() {
        assert!(matches!(PineconeVectorStore::new("", "us-east-1", 8), Err(RagError::ConfigError(_))));
        assert!(matches!(PineconeVectorStore::new("pc-key", " ", 8), Err(RagError::ConfigError(_))));
        assert!(PineconeVectorStore::new("pc-key", "us-east-1", 8).is_ok());
    }

    #[test]
    fn data_url_accepts_bare_and_schemed_hosts() {
        assert_eq!(
            PineconeVectorStore::data_url("idx-abc.svc.pinecone.io", "/query"),
            "https://idx-abc.svc.pinecone.io/query"
        );
        assert_eq!(
            PineconeVectorStore::data_url("http://127.0.0.1:9000/", "/query"),
            "http://127.0.0.1:9000/query"
        );
    }

    #[test]
    fn batch_size_is_clamped() {
        let store = PineconeVectorStore::new("k", "e", 4).unwrap().with_batch_size(500);
        assert_eq!(store.batch_size, 100);
        let store = PineconeVectorStore::new("k", "e", 4).unwrap().with_batch_size(0);
        assert_eq!(store.batch_size, 1);
    }
}
