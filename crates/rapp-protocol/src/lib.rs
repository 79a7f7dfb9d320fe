//! Reactive App Protocol
//!
//! Shared vocabulary between the editor backend, the editor client and
//! instrumented programs.
//!
//! # Message Families
//!
//! - [`Command`]: editor → backend
//! - [`Event`]: backend → editor, including wrapped runtime [`AppMessage`]s
//! - [`AppMessage`]: instrumented program → backend
//! - [`RuntimeCommand`]: backend → instrumented program
//!
//! # Example
//!
//! ```rust
//! use rapp_protocol::{Command, WireMessage};
//!
//! let command = Command::from_text(r#"{"type":"class-delete","data":{"classId":"A"}}"#).unwrap();
//! assert_eq!(command, Command::ClassDelete { class_id: "A".into() });
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod codec;
pub mod error;
pub mod message;
pub mod model;

pub use codec::WireMessage;
pub use error::{ProtocolError, ProtocolResult};
pub use message::{AppMessage, Command, Event, RuntimeCommand};
pub use model::{
    Action, BackendStatus, Class, ClassId, ClassMetadata, Computed, ExtractedClass, Injector,
    InjectorKind, InstanceId, Mixin, Observable,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with protocol messages
    pub use crate::codec::WireMessage;
    pub use crate::message::{AppMessage, Command, Event, RuntimeCommand};
    pub use crate::model::{
        Class, ClassId, ClassMetadata, ExtractedClass, Injector, InjectorKind, InstanceId, Mixin,
    };
}
