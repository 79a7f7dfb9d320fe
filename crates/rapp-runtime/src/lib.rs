//! Reactive App Runtime
//!
//! An instrumented dependency container. Classes are registered under string
//! identifiers; every construction is assigned an identity and reported,
//! together with dependency injections, value updates, list splices and
//! action calls, to a [`Reporter`].
//!
//! # Example
//!
//! ```rust
//! use rapp_runtime::{ChannelReporter, Container, Inject, Observable};
//! use std::sync::Arc;
//!
//! struct Api;
//! struct Store {
//!     api: Inject<Api>,
//!     count: Observable<i64>,
//! }
//!
//! let (reporter, events) = ChannelReporter::new();
//! let container = Container::builder()
//!     .reporter(Arc::new(reporter))
//!     .register_class("Api", |_, _| Ok(Api))
//!     .register_class("Store", |cx, _| {
//!         Ok(Store {
//!             api: cx.inject("api", "Api"),
//!             count: cx.observable("count", 0),
//!         })
//!     })
//!     .build();
//!
//! let store = container.get_singleton("Store").unwrap().downcast::<Store>().unwrap();
//! store.api.get().unwrap();
//! store.count.set(1);
//! assert_eq!(events.try_iter().count(), 5);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod container;
pub mod context;
pub mod error;
pub mod instance;
pub mod members;
pub mod reporter;

pub use container::{Container, ContainerBuilder, Factory};
pub use context::{ConstructionContext, Inject, InjectFactory};
pub use error::{RuntimeError, RuntimeResult};
pub use instance::{Instance, Members};
pub use members::{ActionHandle, Computed, Observable, ObservableVec};
pub use reporter::{ChannelReporter, Reporter, TcpReporter};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for declaring instrumented classes
    pub use crate::container::Container;
    pub use crate::context::{ConstructionContext, Inject, InjectFactory};
    pub use crate::error::{RuntimeError, RuntimeResult};
    pub use crate::members::{ActionHandle, Computed, Observable, ObservableVec};
}
