//! Persisted credentials and backend selection.
//!
//! Settings live in a small JSON file. Environment variables override file
//! values so deployments can keep secrets out of the file entirely.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AssistantError, Result};

/// Environment override for [`Settings::openai_api_key`].
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
/// Environment override for [`Settings::pinecone_api_key`].
pub const PINECONE_API_KEY_ENV: &str = "PINECONE_API_KEY";
/// Environment override for [`Settings::pinecone_environment`].
pub const PINECONE_ENVIRONMENT_ENV: &str = "PINECONE_ENVIRONMENT";

/// User-supplied credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Key for the embedding and completion services.
    pub openai_api_key: Option<String>,
    /// Key for the remote vector index.
    pub pinecone_api_key: Option<String>,
    /// Region the remote index is created in.
    pub pinecone_environment: Option<String>,
    /// Explicit opt-out of the remote index; `None` means "use it when
    /// configured".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_pinecone: Option<bool>,
}

impl Settings {
    /// Read settings from `path`. A missing file yields empty settings.
    ///
    /// # Errors
    ///
    /// Returns [`AssistantError::SettingsIo`] or
    /// [`AssistantError::SettingsFormat`] if the file exists but cannot be
    /// read or parsed.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no settings file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(AssistantError::SettingsIo { path: path.to_path_buf(), source });
            }
        };

        serde_json::from_str(&raw)
            .map_err(|source| AssistantError::SettingsFormat { path: path.to_path_buf(), source })
    }

    /// Write settings to `path` as pretty-printed JSON.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)
            .map_err(|source| AssistantError::SettingsFormat { path: path.to_path_buf(), source })?;
        tokio::fs::write(path, json)
            .await
            .map_err(|source| AssistantError::SettingsIo { path: path.to_path_buf(), source })
    }

    /// Apply the process environment on top of these settings.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from `lookup`; empty values are ignored.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        if let Some(key) = get(OPENAI_API_KEY_ENV) {
            self.openai_api_key = Some(key);
        }
        if let Some(key) = get(PINECONE_API_KEY_ENV) {
            self.pinecone_api_key = Some(key);
        }
        if let Some(env) = get(PINECONE_ENVIRONMENT_ENV) {
            self.pinecone_environment = Some(env);
        }
        self
    }

    /// The completion and embedding key, if set and non-blank.
    pub fn openai_key(&self) -> Option<&str> {
        non_blank(&self.openai_api_key)
    }

    /// Remote index credentials, when both are present and the remote
    /// backend has not been switched off.
    pub fn pinecone(&self) -> Option<(&str, &str)> {
        if self.use_pinecone == Some(false) {
            return None;
        }
        Some((non_blank(&self.pinecone_api_key)?, non_blank(&self.pinecone_environment)?))
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
