//! Reactive App Editor Client
//!
//! Editor-side state for the class graph: backend events and runtime
//! instrumentation are reconciled into one [`GraphModel`], and editor
//! commands are delivered through a buffered [`Outbox`].
//!
//! # Components
//!
//! - [`GraphModel`]: nodes, links, instances and selection
//! - [`Reconciler`]: single task applying events in arrival order
//! - [`Outbox`]: ordered command queue surviving reconnects
//! - [`ClientSession`]: optimistic commands over both
//!
//! # Example
//!
//! ```rust
//! use rapp_client::{GraphModel, Reconciler};
//! use rapp_protocol::{AppMessage, Event, ExtractedClass};
//!
//! # tokio_test::block_on(async {
//! let (graph, _task) = Reconciler::spawn(GraphModel::new());
//! graph.apply(Event::ClassNew(ExtractedClass::new("Counter"))).unwrap();
//! graph.apply(Event::App(AppMessage::Update {
//!     class_id: "Counter".into(),
//!     instance_id: 1,
//!     path: vec!["count".into()],
//!     value: 5.into(),
//! })).unwrap();
//!
//! let model = graph.snapshot().await.unwrap();
//! assert_eq!(model.node("Counter").unwrap().current_instance_id, Some(1));
//! # });
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod error;
pub mod graph;
pub mod outbox;
pub mod reconciler;
pub mod session;
pub mod values;

pub use error::{ClientError, ClientResult};
pub use graph::{link_id, ActionExecution, ClassNode, GraphModel, InstanceState, Link, LinkEnd, Port};
pub use outbox::{ChannelTransport, Delivery, Outbox, Transport};
pub use reconciler::{Reconciler, ReconcilerHandle};
pub use session::ClientSession;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving an editor session
    pub use crate::error::{ClientError, ClientResult};
    pub use crate::graph::GraphModel;
    pub use crate::outbox::{Delivery, Transport};
    pub use crate::reconciler::{Reconciler, ReconcilerHandle};
    pub use crate::session::ClientSession;
}
