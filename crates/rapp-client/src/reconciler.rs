//! Reconciliation loop
//!
//! The loop task owns the only writable [`GraphModel`]. Backend events and
//! local edits are queued to it and applied strictly in arrival order; after
//! each one the model is published on a watch channel.

use crate::error::{ClientError, ClientResult};
use crate::graph::GraphModel;
use rapp_protocol::{ClassId, ClassMetadata, Event, InstanceId};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

enum Input {
    Remote(Event),
    Placeholder {
        class_id: ClassId,
        metadata: ClassMetadata,
        reply: oneshot::Sender<ClientResult<()>>,
    },
    Move {
        class_id: ClassId,
        metadata: ClassMetadata,
    },
    RemoveLinks {
        from: ClassId,
        to: ClassId,
    },
    SelectInstance {
        class_id: ClassId,
        instance_id: InstanceId,
    },
    SelectClass(ClassId),
    Snapshot(oneshot::Sender<GraphModel>),
}

impl std::fmt::Debug for Input {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Remote(event) => write!(f, "Remote({event:?})"),
            Self::Placeholder { class_id, .. } => write!(f, "Placeholder({class_id})"),
            Self::Move { class_id, .. } => write!(f, "Move({class_id})"),
            Self::RemoveLinks { from, to } => write!(f, "RemoveLinks({from} -> {to})"),
            Self::SelectInstance { class_id, instance_id } => write!(f, "SelectInstance({class_id}, {instance_id})"),
            Self::SelectClass(class_id) => write!(f, "SelectClass({class_id})"),
            Self::Snapshot(_) => f.write_str("Snapshot"),
        }
    }
}

/// Owner of the graph model
#[derive(Debug)]
pub struct Reconciler {
    model: GraphModel,
    publish: watch::Sender<GraphModel>,
}

impl Reconciler {
    /// Start the loop on its own task
    ///
    /// The loop ends once every [`ReconcilerHandle`] is dropped.
    #[must_use]
    pub fn spawn(model: GraphModel) -> (ReconcilerHandle, JoinHandle<()>) {
        let (publish, published) = watch::channel(model.clone());
        let (tx, rx) = mpsc::unbounded_channel();
        let reconciler = Self { model, publish };
        let task = tokio::spawn(reconciler.run(rx));
        (
            ReconcilerHandle {
                inputs: tx,
                published,
            },
            task,
        )
    }

    async fn run(mut self, mut inputs: mpsc::UnboundedReceiver<Input>) {
        while let Some(input) = inputs.recv().await {
            tracing::trace!(?input, "reconciling");
            if self.handle(input) {
                self.publish.send_replace(self.model.clone());
            }
        }
        tracing::debug!("reconciler stopped");
    }

    /// Apply one input, returning whether the model may have changed
    fn handle(&mut self, input: Input) -> bool {
        // A dropped reply receiver only means the caller stopped waiting
        match input {
            Input::Remote(event) => self.model.apply(event),
            Input::Placeholder {
                class_id,
                metadata,
                reply,
            } => {
                let _ = reply.send(self.model.insert_placeholder(&class_id, metadata));
            }
            Input::Move { class_id, metadata } => {
                if let Err(e) = self.model.move_class(&class_id, metadata) {
                    tracing::debug!(error = %e, "ignoring move");
                }
            }
            Input::RemoveLinks { from, to } => {
                self.model.remove_links(&from, &to);
            }
            Input::SelectInstance { class_id, instance_id } => {
                if let Err(e) = self.model.select_instance(&class_id, instance_id) {
                    tracing::debug!(error = %e, "ignoring instance selection");
                }
            }
            Input::SelectClass(class_id) => {
                if let Err(e) = self.model.select_class(&class_id) {
                    tracing::debug!(error = %e, "ignoring selection");
                }
            }
            Input::Snapshot(reply) => {
                let _ = reply.send(self.model.clone());
                return false;
            }
        }
        true
    }
}

/// Handle to a running [`Reconciler`]
#[derive(Debug, Clone)]
pub struct ReconcilerHandle {
    inputs: mpsc::UnboundedSender<Input>,
    published: watch::Receiver<GraphModel>,
}

impl ReconcilerHandle {
    fn push(&self, input: Input) -> ClientResult<()> {
        self.inputs.send(input).map_err(|_| ClientError::Stopped)
    }

    /// Queue a backend event
    ///
    /// # Errors
    /// Returns [`ClientError::Stopped`] if the loop has ended
    pub fn apply(&self, event: Event) -> ClientResult<()> {
        self.push(Input::Remote(event))
    }

    /// Add a placeholder node, refused if the id is taken
    ///
    /// # Errors
    /// Returns [`ClientError::ClassExists`] or [`ClientError::Stopped`]
    pub async fn place(&self, class_id: impl Into<ClassId>, metadata: ClassMetadata) -> ClientResult<()> {
        let (tx, rx) = oneshot::channel();
        self.push(Input::Placeholder {
            class_id: class_id.into(),
            metadata,
            reply: tx,
        })?;
        rx.await.map_err(|_| ClientError::Stopped)?
    }

    /// Move a node
    ///
    /// # Errors
    /// Returns [`ClientError::Stopped`] if the loop has ended
    pub fn move_class(&self, class_id: impl Into<ClassId>, metadata: ClassMetadata) -> ClientResult<()> {
        self.push(Input::Move {
            class_id: class_id.into(),
            metadata,
        })
    }

    /// Drop the links from `from` into `to`
    ///
    /// # Errors
    /// Returns [`ClientError::Stopped`] if the loop has ended
    pub fn remove_links(&self, from: impl Into<ClassId>, to: impl Into<ClassId>) -> ClientResult<()> {
        self.push(Input::RemoveLinks {
            from: from.into(),
            to: to.into(),
        })
    }

    /// Focus an instance and select its node
    ///
    /// # Errors
    /// Returns [`ClientError::Stopped`] if the loop has ended
    pub fn select_instance(&self, class_id: impl Into<ClassId>, instance_id: InstanceId) -> ClientResult<()> {
        self.push(Input::SelectInstance {
            class_id: class_id.into(),
            instance_id,
        })
    }

    /// Select a node
    ///
    /// # Errors
    /// Returns [`ClientError::Stopped`] if the loop has ended
    pub fn select_class(&self, class_id: impl Into<ClassId>) -> ClientResult<()> {
        self.push(Input::SelectClass(class_id.into()))
    }

    /// Model after every input queued so far has been applied
    ///
    /// # Errors
    /// Returns [`ClientError::Stopped`] if the loop has ended
    pub async fn snapshot(&self) -> ClientResult<GraphModel> {
        let (tx, rx) = oneshot::channel();
        self.push(Input::Snapshot(tx))?;
        rx.await.map_err(|_| ClientError::Stopped)
    }

    /// Receiver of every published model
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<GraphModel> {
        self.published.clone()
    }
}
