//! Directory synchronizer
//!
//! [`DirectorySync`] is the single owner of the class registry and the single
//! writer of the metadata file. Once spawned it drains one queue of
//! filesystem events and one queue of [`SyncHandle`] requests in arrival
//! order; every outcome is published as a [`SyncEvent`].

use crate::error::{SyncError, SyncResult};
use crate::layout::ProjectLayout;
use crate::metadata::MetadataStore;
use crate::registry::ClassRegistry;
use crate::watcher::{FileEvent, FileEventKind};
use rapp_protocol::{Class, ClassId, ClassMetadata, Event, ExtractedClass};
use rapp_source::SourceMutator;
use std::collections::BTreeMap;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Registry change published by the synchronizer
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// A class file appeared
    Created(ExtractedClass),
    /// A class file changed; carries its current position
    Changed(Class),
    /// A class file disappeared
    Deleted(ClassId),
}

impl From<SyncEvent> for Event {
    fn from(event: SyncEvent) -> Self {
        match event {
            SyncEvent::Created(extracted) => Event::ClassNew(extracted),
            SyncEvent::Changed(class) => Event::ClassUpdate(class),
            SyncEvent::Deleted(class_id) => Event::ClassDelete(class_id),
        }
    }
}

/// Owner of the registry and the metadata file
#[derive(Debug)]
pub struct DirectorySync {
    layout: ProjectLayout,
    mutator: SourceMutator,
    metadata: MetadataStore,
    registry: ClassRegistry,
    events: mpsc::UnboundedSender<SyncEvent>,
}

impl DirectorySync {
    /// Prepare the project directory and load the initial registry
    ///
    /// Missing directories, metadata and entry file are created. Files that
    /// fail to extract are logged and left out.
    ///
    /// # Errors
    /// Returns IO errors on directories that cannot be created or listed
    pub async fn initialize(
        layout: ProjectLayout,
        mutator: SourceMutator,
        events: mpsc::UnboundedSender<SyncEvent>,
    ) -> SyncResult<Self> {
        for dir in [layout.app_dir(), layout.config_dir()] {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| SyncError::io_error(dir, e))?;
        }
        let metadata = MetadataStore::load(layout.metadata_path()).await?;
        mutator.ensure_entry().await?;

        let mut sync = Self {
            layout,
            mutator,
            metadata,
            registry: ClassRegistry::new(),
            events,
        };
        sync.load_registry().await?;
        tracing::info!(
            classes = sync.registry.len(),
            dir = %sync.layout.app_dir().display(),
            "initialized class registry"
        );
        Ok(sync)
    }

    async fn load_registry(&mut self) -> SyncResult<()> {
        let dir = self.layout.app_dir().to_path_buf();
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| SyncError::io_error(&dir, e))?;
        let mut class_ids = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| SyncError::io_error(&dir, e))?
        {
            if let Some(class_id) = entry.file_name().to_str().and_then(|n| self.layout.class_id_of(n)) {
                class_ids.push(class_id);
            }
        }
        class_ids.sort();

        for class_id in class_ids {
            match self.mutator.extract_class(&class_id).await {
                Ok(extracted) => {
                    self.registry.insert(extracted);
                }
                Err(e) => tracing::warn!(class_id = %class_id, error = %e, "skipping class"),
            }
        }
        Ok(())
    }

    /// Project layout
    #[inline]
    #[must_use]
    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    /// Current registry
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &ClassRegistry {
        &self.registry
    }

    /// Current positions
    #[inline]
    #[must_use]
    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    /// Every class joined with its position
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<ClassId, Class> {
        self.registry.snapshot(&self.metadata)
    }

    /// Reconcile one filesystem event
    ///
    /// Events on ineligible files are ignored.
    ///
    /// # Errors
    /// Propagates extraction, metadata and entry-file failures
    pub async fn handle_event(&mut self, event: &FileEvent) -> SyncResult<()> {
        let Some(class_id) = self.layout.class_id_of(&event.file_name) else {
            return Ok(());
        };
        let exists = tokio::fs::try_exists(self.layout.class_path(&class_id))
            .await
            .unwrap_or(false);

        match (event.kind, exists) {
            (_, true) => self.class_written(&class_id).await,
            (FileEventKind::Rename, false) => self.class_deleted(&class_id).await,
            (FileEventKind::Change, false) => Ok(()),
        }
    }

    async fn class_written(&mut self, class_id: &str) -> SyncResult<()> {
        let extracted = self.mutator.extract_class(class_id).await?;
        let event = if self.registry.contains(class_id) {
            let position = self.metadata.get(class_id).unwrap_or_default();
            SyncEvent::Changed(Class::new(extracted.clone(), position))
        } else {
            SyncEvent::Created(extracted.clone())
        };
        self.registry.insert(extracted);
        tracing::debug!(class_id = %class_id, "reconciled class");
        self.publish(event);
        Ok(())
    }

    async fn class_deleted(&mut self, class_id: &str) -> SyncResult<()> {
        let registered = self.registry.remove(class_id).is_some();
        let positioned = self.metadata.remove(class_id).is_some();
        if positioned {
            self.metadata.save().await?;
        }
        // The entry file may register classes that never loaded
        self.mutator.unregister_class(class_id).await?;
        if !registered && !positioned {
            return Ok(());
        }
        tracing::info!(class_id = %class_id, "class removed from registry");
        self.publish(SyncEvent::Deleted(class_id.to_string()));
        Ok(())
    }

    /// Store the position of a class and persist the metadata file
    ///
    /// # Errors
    /// Returns metadata write failures
    pub async fn set_position(&mut self, class_id: &str, metadata: ClassMetadata) -> SyncResult<()> {
        self.metadata.set(class_id, metadata);
        self.metadata.save().await
    }

    /// Move the position of `from` to `to` and persist it
    ///
    /// # Errors
    /// Returns metadata write failures
    pub async fn rename_position(&mut self, from: &str, to: &str) -> SyncResult<Option<ClassMetadata>> {
        let moved = self.metadata.rename(from, to);
        if moved.is_some() {
            self.metadata.save().await?;
        }
        Ok(moved)
    }

    fn publish(&self, event: SyncEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!("no subscriber for registry changes");
        }
    }

    /// Run the reconciliation loop on its own task
    ///
    /// The loop ends once every [`SyncHandle`] is dropped.
    pub fn spawn(self, file_events: mpsc::UnboundedReceiver<FileEvent>) -> (SyncHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(self.run(file_events, rx));
        (SyncHandle { requests: tx }, task)
    }

    async fn run(
        mut self,
        mut file_events: mpsc::UnboundedReceiver<FileEvent>,
        mut requests: mpsc::UnboundedReceiver<SyncRequest>,
    ) {
        let mut watching = true;
        loop {
            tokio::select! {
                biased;
                event = file_events.recv(), if watching => match event {
                    Some(event) => {
                        if let Err(e) = self.handle_event(&event).await {
                            tracing::warn!(file = %event.file_name, error = %e, "failed to reconcile file event");
                        }
                    }
                    None => watching = false,
                },
                request = requests.recv() => match request {
                    Some(request) => self.serve(request).await,
                    None => break,
                },
            }
        }
        tracing::debug!("synchronizer stopped");
    }

    async fn serve(&mut self, request: SyncRequest) {
        // A dropped reply receiver only means the caller stopped waiting
        match request {
            SyncRequest::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
            SyncRequest::SetPosition { class_id, metadata, reply } => {
                let _ = reply.send(self.set_position(&class_id, metadata).await);
            }
            SyncRequest::RenamePosition { from, to, reply } => {
                let _ = reply.send(self.rename_position(&from, &to).await);
            }
            SyncRequest::Reconcile { class_id, reply } => {
                let event = FileEvent::rename(format!("{class_id}.{}", self.layout.extension()));
                let _ = reply.send(self.handle_event(&event).await);
            }
        }
    }
}

enum SyncRequest {
    Snapshot(oneshot::Sender<BTreeMap<ClassId, Class>>),
    SetPosition {
        class_id: ClassId,
        metadata: ClassMetadata,
        reply: oneshot::Sender<SyncResult<()>>,
    },
    RenamePosition {
        from: ClassId,
        to: ClassId,
        reply: oneshot::Sender<SyncResult<Option<ClassMetadata>>>,
    },
    Reconcile {
        class_id: ClassId,
        reply: oneshot::Sender<SyncResult<()>>,
    },
}

/// Handle to a running [`DirectorySync`]
#[derive(Debug, Clone)]
pub struct SyncHandle {
    requests: mpsc::UnboundedSender<SyncRequest>,
}

impl std::fmt::Debug for SyncRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Snapshot(_) => f.write_str("Snapshot"),
            Self::SetPosition { class_id, .. } => write!(f, "SetPosition({class_id})"),
            Self::RenamePosition { from, to, .. } => write!(f, "RenamePosition({from} -> {to})"),
            Self::Reconcile { class_id, .. } => write!(f, "Reconcile({class_id})"),
        }
    }
}

impl SyncHandle {
    async fn call<T>(&self, request: SyncRequest, reply: oneshot::Receiver<T>) -> SyncResult<T> {
        self.requests.send(request).map_err(|_| SyncError::Stopped)?;
        reply.await.map_err(|_| SyncError::Stopped)
    }

    /// Every class joined with its position
    ///
    /// # Errors
    /// Returns [`SyncError::Stopped`] if the loop has ended
    pub async fn snapshot(&self) -> SyncResult<BTreeMap<ClassId, Class>> {
        let (tx, rx) = oneshot::channel();
        self.call(SyncRequest::Snapshot(tx), rx).await
    }

    /// Store the position of a class
    ///
    /// # Errors
    /// Returns metadata write failures or [`SyncError::Stopped`]
    pub async fn set_position(&self, class_id: impl Into<ClassId>, metadata: ClassMetadata) -> SyncResult<()> {
        let (tx, rx) = oneshot::channel();
        let request = SyncRequest::SetPosition {
            class_id: class_id.into(),
            metadata,
            reply: tx,
        };
        self.call(request, rx).await?
    }

    /// Move the position of a renamed class
    ///
    /// # Errors
    /// Returns metadata write failures or [`SyncError::Stopped`]
    pub async fn rename_position(
        &self,
        from: impl Into<ClassId>,
        to: impl Into<ClassId>,
    ) -> SyncResult<Option<ClassMetadata>> {
        let (tx, rx) = oneshot::channel();
        let request = SyncRequest::RenamePosition {
            from: from.into(),
            to: to.into(),
            reply: tx,
        };
        self.call(request, rx).await?
    }

    /// Reconcile a class file now instead of waiting for the watcher
    ///
    /// # Errors
    /// Propagates reconciliation failures or [`SyncError::Stopped`]
    pub async fn reconcile(&self, class_id: impl Into<ClassId>) -> SyncResult<()> {
        let (tx, rx) = oneshot::channel();
        let request = SyncRequest::Reconcile {
            class_id: class_id.into(),
            reply: tx,
        };
        self.call(request, rx).await?
    }
}
