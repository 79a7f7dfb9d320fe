//! Error types for the editor client

use rapp_protocol::{ClassId, ProtocolError};

/// Errors raised by the client session and its reconciler
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Message could not be encoded or decoded
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A node with this id is already on the graph
    #[error("class {0} already exists")]
    ClassExists(ClassId),

    /// A class cannot inject itself
    #[error("class {0} cannot inject itself")]
    SelfInjection(ClassId),

    /// No node with this id is on the graph
    #[error("class {0} is not on the graph")]
    UnknownClass(ClassId),

    /// Transport failed to connect or deliver
    #[error("transport error: {0}")]
    Transport(String),

    /// Reconciler task has stopped
    #[error("reconciler is not running")]
    Stopped,
}

impl ClientError {
    /// Create transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }
}

/// Result alias for client operations
pub type ClientResult<T> = Result<T, ClientError>;
