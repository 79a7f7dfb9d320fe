//! Error types for the editor backend

use rapp_protocol::ProtocolError;
use rapp_source::SourceError;
use rapp_sync::SyncError;
use std::path::PathBuf;

/// Errors raised while serving editor commands
#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    /// Synchronizer failed or stopped
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// Source rewrite failed
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Message could not be encoded or decoded
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// `reactive-app.toml` is not valid
    #[error("invalid config {path}: {source}")]
    Config {
        /// Config file
        path: PathBuf,
        /// Parse failure
        #[source]
        source: toml::de::Error,
    },

    /// Command refers to a class that is not registered
    #[error("class '{0}' is not registered")]
    UnknownClass(String),

    /// `run-action` arrived with no instrumented program connected
    #[error("no instrumented program is connected")]
    NoRuntime,

    /// External open command could not be spawned
    #[error("failed to run '{command}': {source}")]
    Open {
        /// Configured command
        command: String,
        /// Spawn failure
        #[source]
        source: std::io::Error,
    },

    /// Listener or connection IO failed
    #[error("io error on {address}: {source}")]
    Io {
        /// Address involved
        address: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl EditorError {
    /// Create IO error for address
    pub fn io_error(address: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            address: address.into(),
            source,
        }
    }
}

/// Result alias for editor operations
pub type EditorResult<T> = Result<T, EditorError>;
