//! Error types for the instrumentation runtime
//!
//! Misuse of the container is reported synchronously so the host program's
//! own error handling takes over.

use rapp_protocol::{ClassId, InstanceId};

/// Errors raised by the container
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// `get` was called with an identifier that was never registered
    #[error("The identifier {0} is not registered")]
    UnregisteredIdentifier(ClassId),

    /// An injected property was read on an object not built by a container
    #[error("injected property '{property_name}' read outside of a container")]
    InjectionOutsideContainer {
        /// Property that was read
        property_name: String,
    },

    /// A resolved instance is not of the requested type
    #[error("instance of '{class_id}' is not a {expected}")]
    TypeMismatch {
        /// Identifier that was resolved
        class_id: ClassId,
        /// Requested type
        expected: &'static str,
    },

    /// No action of that name is registered on the instance
    #[error("instance {instance_id} has no action '{name}'")]
    UnknownAction {
        /// Target instance
        instance_id: InstanceId,
        /// Requested action
        name: String,
    },

    /// User construction logic failed
    #[error("construction of '{class_id}' failed: {message}")]
    Construction {
        /// Identifier being constructed
        class_id: ClassId,
        /// Failure description
        message: String,
    },

    /// Devtool connection failed
    #[error("devtool connection to {address} failed: {source}")]
    Devtool {
        /// Devtool address
        address: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl RuntimeError {
    /// Create construction error
    pub fn construction(class_id: impl Into<ClassId>, message: impl Into<String>) -> Self {
        Self::Construction {
            class_id: class_id.into(),
            message: message.into(),
        }
    }
}

/// Result alias for runtime operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;
