//! Editor session
//!
//! Pairs the outbox with the reconciler. Commands with a visible local
//! effect apply it to the graph first, then go out through the outbox.

use crate::error::{ClientError, ClientResult};
use crate::graph::GraphModel;
use crate::outbox::{Delivery, Outbox, Transport};
use crate::reconciler::ReconcilerHandle;
use rapp_protocol::{ClassId, ClassMetadata, Command, Event, InjectorKind, InstanceId, Mixin, WireMessage};
use tokio::sync::watch;

/// One editor connected to one backend
#[derive(Debug)]
pub struct ClientSession<T> {
    outbox: Outbox<T>,
    graph: ReconcilerHandle,
}

impl<T: Transport> ClientSession<T> {
    /// Create a session over `transport` feeding `graph`
    pub fn new(transport: T, graph: ReconcilerHandle) -> Self {
        Self {
            outbox: Outbox::new(transport),
            graph,
        }
    }

    /// Outgoing queue
    #[inline]
    #[must_use]
    pub fn outbox(&self) -> &Outbox<T> {
        &self.outbox
    }

    /// Reconciler feeding this session's graph
    #[inline]
    #[must_use]
    pub fn graph(&self) -> &ReconcilerHandle {
        &self.graph
    }

    /// Receiver of every published graph
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<GraphModel> {
        self.graph.subscribe()
    }

    /// Connection opened: flush buffered commands
    ///
    /// # Errors
    /// Returns the first delivery failure
    pub async fn opened(&mut self) -> ClientResult<usize> {
        self.outbox.opened().await
    }

    /// Connection lost
    pub fn closed(&mut self) {
        self.outbox.closed();
    }

    /// Decode one backend frame and queue it for reconciliation
    ///
    /// # Errors
    /// Returns [`ClientError::Protocol`] for malformed frames or
    /// [`ClientError::Stopped`] if the reconciler has ended
    pub fn receive(&self, text: &str) -> ClientResult<()> {
        let event = Event::from_text(text)?;
        self.graph.apply(event)
    }

    async fn send(&mut self, command: Command) -> ClientResult<Delivery> {
        tracing::debug!(?command, "sending command");
        self.outbox.send(command).await
    }

    /// Ask for backend status and the class snapshot
    ///
    /// # Errors
    /// Returns encoding failures
    pub async fn init(&mut self) -> ClientResult<Delivery> {
        self.send(Command::Init).await
    }

    /// Place a new class node and ask the backend to create it
    ///
    /// # Errors
    /// Returns [`ClientError::ClassExists`] without sending if the id is on
    /// the graph
    pub async fn create_class(&mut self, class_id: impl Into<ClassId>, x: f64, y: f64) -> ClientResult<Delivery> {
        let class_id = class_id.into();
        self.graph.place(class_id.clone(), ClassMetadata::new(x, y)).await?;
        self.send(Command::ClassNew { class_id, x, y }).await
    }

    /// Move a class node and persist its position
    ///
    /// # Errors
    /// Returns encoding or reconciler failures
    pub async fn move_class(&mut self, class_id: impl Into<ClassId>, x: f64, y: f64) -> ClientResult<Delivery> {
        let class_id = class_id.into();
        self.graph.move_class(class_id.clone(), ClassMetadata::new(x, y))?;
        self.send(Command::ClassUpdate { class_id, x, y }).await
    }

    /// Inject `from` into `to`
    ///
    /// # Errors
    /// Returns [`ClientError::SelfInjection`] without sending when both are
    /// the same class
    pub async fn inject(&mut self, from: impl Into<ClassId>, to: impl Into<ClassId>) -> ClientResult<Delivery> {
        let (from_class_id, to_class_id) = (from.into(), to.into());
        if from_class_id == to_class_id {
            return Err(ClientError::SelfInjection(from_class_id));
        }
        self.send(Command::Inject {
            from_class_id,
            to_class_id,
        })
        .await
    }

    /// Rewrite an injector property
    ///
    /// # Errors
    /// Returns encoding failures
    pub async fn replace_injector(
        &mut self,
        class_id: impl Into<ClassId>,
        inject_class_id: impl Into<ClassId>,
        property_name: impl Into<String>,
        kind: InjectorKind,
    ) -> ClientResult<Delivery> {
        self.send(Command::InjectReplace {
            class_id: class_id.into(),
            inject_class_id: inject_class_id.into(),
            property_name: property_name.into(),
            kind,
        })
        .await
    }

    /// Drop the links from `from` into `to` and remove the injector
    ///
    /// # Errors
    /// Returns encoding or reconciler failures
    pub async fn remove_injector(&mut self, from: impl Into<ClassId>, to: impl Into<ClassId>) -> ClientResult<Delivery> {
        let (from_class_id, to_class_id) = (from.into(), to.into());
        self.graph.remove_links(from_class_id.clone(), to_class_id.clone())?;
        self.send(Command::InjectRemove {
            from_class_id,
            to_class_id,
        })
        .await
    }

    /// Open a class file in the external editor
    ///
    /// # Errors
    /// Returns encoding failures
    pub async fn open_class(&mut self, class_id: impl Into<ClassId>) -> ClientResult<Delivery> {
        self.send(Command::ClassOpen {
            class_id: class_id.into(),
        })
        .await
    }

    /// Run an action on a live instance
    ///
    /// # Errors
    /// Returns encoding failures
    pub async fn run_action(&mut self, instance_id: InstanceId, name: impl Into<String>) -> ClientResult<Delivery> {
        self.send(Command::RunAction {
            instance_id,
            name: name.into(),
        })
        .await
    }

    /// Toggle a mixin on a class
    ///
    /// # Errors
    /// Returns encoding failures
    pub async fn toggle_mixin(&mut self, class_id: impl Into<ClassId>, mixin: Mixin) -> ClientResult<Delivery> {
        self.send(Command::ToggleMixin {
            class_id: class_id.into(),
            mixin,
        })
        .await
    }

    /// Delete a class
    ///
    /// # Errors
    /// Returns encoding failures
    pub async fn delete_class(&mut self, class_id: impl Into<ClassId>) -> ClientResult<Delivery> {
        self.send(Command::ClassDelete {
            class_id: class_id.into(),
        })
        .await
    }

    /// Rename a class
    ///
    /// # Errors
    /// Returns encoding failures
    pub async fn rename_class(
        &mut self,
        class_id: impl Into<ClassId>,
        to_class_id: impl Into<ClassId>,
    ) -> ClientResult<Delivery> {
        self.send(Command::ClassRename {
            class_id: class_id.into(),
            to_class_id: to_class_id.into(),
        })
        .await
    }

    /// Focus an instance in the inspector and select its node
    ///
    /// # Errors
    /// Returns [`ClientError::Stopped`] if the reconciler has ended
    pub fn select_instance(&self, class_id: impl Into<ClassId>, instance_id: InstanceId) -> ClientResult<()> {
        self.graph.select_instance(class_id, instance_id)
    }

    /// Select a node
    ///
    /// # Errors
    /// Returns [`ClientError::Stopped`] if the reconciler has ended
    pub fn select_class(&self, class_id: impl Into<ClassId>) -> ClientResult<()> {
        self.graph.select_class(class_id)
    }
}
