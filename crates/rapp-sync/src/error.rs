//! Error types for directory synchronization

use rapp_source::SourceError;
use std::path::PathBuf;

/// Errors raised while initializing or reconciling a project directory
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Extraction or rewrite failed
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// Filesystem watch could not be installed
    #[error("watch error: {0}")]
    Watch(#[from] notify::Error),

    /// Metadata file is not valid JSON
    #[error("invalid metadata in {path}: {source}")]
    ConfigParse {
        /// Metadata file
        path: PathBuf,
        /// Parse failure
        #[source]
        source: serde_json::Error,
    },

    /// Metadata could not be serialized
    #[error("metadata serialization failed: {0}")]
    Serialize(#[source] serde_json::Error),

    /// IO error on a project path
    #[error("io error on {path}: {source}")]
    Io {
        /// Path involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Synchronizer task has stopped
    #[error("synchronizer is not running")]
    Stopped,
}

impl SyncError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result alias for synchronizer operations
pub type SyncResult<T> = Result<T, SyncError>;
