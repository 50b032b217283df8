//! Error types for the `joe-assistant` crate.

use std::path::PathBuf;

use joe_rag::RagError;
use thiserror::Error;

/// Errors raised by settings, uploads and replies.
#[derive(Debug, Error)]
pub enum AssistantError {
    /// A knowledge-base operation failed.
    #[error(transparent)]
    Rag(#[from] RagError),

    /// The settings file could not be read or written.
    #[error("Settings file {path}: {source}")]
    SettingsIo {
        /// File that was being accessed.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The settings file is not valid JSON.
    #[error("Settings file {path} is malformed: {source}")]
    SettingsFormat {
        /// File that was being parsed.
        path: PathBuf,
        /// Underlying parse failure.
        #[source]
        source: serde_json::Error,
    },

    /// A required credential is missing.
    #[error("Missing setting: {0}")]
    MissingSetting(&'static str),

    /// The completion service failed or returned nothing usable.
    #[error("Completion error: {0}")]
    Completion(String),
}

/// Why a single file was not indexed.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Only plain-text files are accepted.
    #[error("{0} is not a .txt file")]
    UnsupportedFile(String),

    /// The file could not be read as UTF-8 text.
    #[error("Could not read {name}: {source}")]
    Read {
        /// File name as reported to the user.
        name: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// Chunking or embedding failed for this file.
    #[error(transparent)]
    Rag(#[from] RagError),
}

/// A convenience result type for assistant operations.
pub type Result<T> = std::result::Result<T, AssistantError>;
