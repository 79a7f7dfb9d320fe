//! Error types for the wire codec

/// Errors while encoding or decoding a message
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Text is not a valid message
    #[error("failed to decode message: {source}")]
    Decode {
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// Message could not be serialized
    #[error("failed to encode message: {source}")]
    Encode {
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },
}

/// Result alias for codec operations
pub type ProtocolResult<T> = Result<T, ProtocolError>;
