//! Reactive App Directory Synchronizer
//!
//! Keeps an in-memory class registry consistent with the class directory of
//! a project, whether files are changed by the editor or by hand.
//!
//! # Flow
//!
//! 1. [`DirectorySync::initialize`] heals missing directories, metadata and
//!    entry file, then extracts every eligible class file
//! 2. [`DirectoryWatcher::start`] queues classified filesystem events
//! 3. [`DirectorySync::spawn`] drains that queue and [`SyncHandle`] requests
//!    on one task, publishing [`SyncEvent`]s

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod error;
pub mod layout;
pub mod metadata;
pub mod registry;
pub mod sync;
pub mod watcher;

pub use error::{SyncError, SyncResult};
pub use layout::ProjectLayout;
pub use metadata::MetadataStore;
pub use registry::ClassRegistry;
pub use sync::{DirectorySync, SyncEvent, SyncHandle};
pub use watcher::{classify, DirectoryWatcher, FileEvent, FileEventKind};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for running a synchronizer
    pub use crate::error::{SyncError, SyncResult};
    pub use crate::layout::ProjectLayout;
    pub use crate::sync::{DirectorySync, SyncEvent, SyncHandle};
    pub use crate::watcher::DirectoryWatcher;
}
