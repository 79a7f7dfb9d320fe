//! Reactive App Editor Backend
//!
//! Serves the class graph of a project to editor sessions over WebSocket,
//! rewrites class files on their behalf, and relays instrumentation
//! between running programs and the editor.
//!
//! # Endpoints
//!
//! - [`server::serve`]: editor sessions at `/ws`
//! - [`devtool::serve_devtool`]: instrumented programs over NDJSON/TCP

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod backend;
pub mod config;
pub mod devtool;
pub mod error;
pub mod server;
pub mod status;

pub use backend::{EditorBackend, ProgramTicket};
pub use config::EditorConfig;
pub use devtool::serve_devtool;
pub use error::{EditorError, EditorResult};
pub use server::{respond, router, serve};
pub use status::detect_status;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for running the editor backend
    pub use crate::backend::EditorBackend;
    pub use crate::config::EditorConfig;
    pub use crate::error::{EditorError, EditorResult};
}
