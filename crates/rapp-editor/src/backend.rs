//! Command orchestration
//!
//! [`EditorBackend`] turns editor commands into source rewrites and
//! synchronizer requests. Registry changes reach every editor session as
//! broadcast [`Event`]s; instrumented programs reach them as
//! [`Event::App`].

use crate::config::EditorConfig;
use crate::error::{EditorError, EditorResult};
use crate::status::detect_status;
use parking_lot::Mutex;
use rapp_protocol::{ClassMetadata, Command, Event, InjectorKind, InstanceId, RuntimeCommand};
use rapp_source::{BasicFormatter, FormatOptions, SourceError, SourceMutator, SourceWriter};
use rapp_sync::{DirectorySync, DirectoryWatcher, ProjectLayout, SyncEvent, SyncHandle};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

const EVENT_CAPACITY: usize = 1024;

struct Program {
    id: u64,
    commands: mpsc::UnboundedSender<RuntimeCommand>,
}

struct BackendInner {
    config: EditorConfig,
    layout: ProjectLayout,
    mutator: SourceMutator,
    sync: SyncHandle,
    events: broadcast::Sender<Event>,
    program: Mutex<Option<Program>>,
    next_program: AtomicU64,
    watcher: Mutex<Option<DirectoryWatcher>>,
}

/// Shared editor backend
#[derive(Clone)]
pub struct EditorBackend {
    inner: Arc<BackendInner>,
}

impl std::fmt::Debug for EditorBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorBackend")
            .field("layout", &self.inner.layout)
            .field("program_connected", &self.inner.program.lock().is_some())
            .finish_non_exhaustive()
    }
}

/// Ticket identifying one connected instrumented program
#[derive(Debug)]
pub struct ProgramTicket {
    /// Connection number
    pub id: u64,
    /// Commands to deliver to the program
    pub commands: mpsc::UnboundedReceiver<RuntimeCommand>,
}

impl EditorBackend {
    /// Prepare the project and start synchronizing it
    ///
    /// # Errors
    /// Returns initialization failures of the synchronizer or the watcher
    pub async fn start(config: EditorConfig) -> EditorResult<Self> {
        let format = FormatOptions::load(&config.root).await;
        let writer = Arc::new(SourceWriter::new(Arc::new(BasicFormatter::new(format.clone()))));
        let layout = config.layout();
        let mutator = layout.mutator(config.mutation_options(format), writer);

        let (sync_tx, sync_rx) = mpsc::unbounded_channel();
        let sync = DirectorySync::initialize(layout.clone(), mutator.clone(), sync_tx).await?;

        let (watcher, file_events) = if config.watch {
            let (watcher, file_events) = DirectoryWatcher::start(layout.app_dir())?;
            (Some(watcher), file_events)
        } else {
            // The sender drops here; the loop then serves requests only
            let (_, file_events) = mpsc::unbounded_channel();
            (None, file_events)
        };
        let (sync, _task) = sync.spawn(file_events);

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        tokio::spawn(forward_sync_events(sync_rx, events.clone()));

        tracing::info!(root = %config.root.display(), watch = config.watch, "editor backend started");
        Ok(Self {
            inner: Arc::new(BackendInner {
                config,
                layout,
                mutator,
                sync,
                events,
                program: Mutex::new(None),
                next_program: AtomicU64::new(1),
                watcher: Mutex::new(watcher),
            }),
        })
    }

    /// Configuration in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &EditorConfig {
        &self.inner.config
    }

    /// Project paths in use
    #[inline]
    #[must_use]
    pub fn layout(&self) -> &ProjectLayout {
        &self.inner.layout
    }

    /// Receive every broadcast event
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.inner.events.subscribe()
    }

    /// Broadcast an event to every session
    pub fn publish(&self, event: Event) {
        if self.inner.events.send(event).is_err() {
            tracing::trace!("no editor session connected");
        }
    }

    /// Stop watching the class directory
    pub fn stop_watching(&self) {
        if self.inner.watcher.lock().take().is_some() {
            tracing::info!("stopped watching class directory");
        }
    }

    /// Register a newly connected program, replacing any previous one
    #[must_use]
    pub fn attach_program(&self) -> ProgramTicket {
        let id = self.inner.next_program.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        *self.inner.program.lock() = Some(Program { id, commands: tx });
        tracing::info!(program = id, "instrumented program connected");
        ProgramTicket { id, commands: rx }
    }

    /// Forget a disconnected program and tell every session
    ///
    /// A newer program that replaced `id` stays attached.
    pub fn detach_program(&self, id: u64) {
        {
            let mut program = self.inner.program.lock();
            if program.as_ref().is_some_and(|p| p.id == id) {
                *program = None;
            }
        }
        tracing::info!(program = id, "instrumented program disconnected");
        self.publish(Event::Disconnect);
    }

    /// Apply one editor command
    ///
    /// Returns the events addressed only to the sender; everything else is
    /// broadcast.
    ///
    /// # Errors
    /// Returns rewrite, synchronizer and delivery failures
    pub async fn handle(&self, command: Command) -> EditorResult<Vec<Event>> {
        tracing::debug!(?command, "handling command");
        match command {
            Command::Init => {
                let status = detect_status(&self.inner.config.root, &self.inner.config.library_import).await;
                let classes = self.inner.sync.snapshot().await?;
                return Ok(vec![Event::Init(status), Event::Classes(classes)]);
            }
            Command::ClassNew { class_id, x, y } => {
                self.inner.mutator.create_class(&class_id).await?;
                self.inner.sync.set_position(class_id.as_str(), ClassMetadata::new(x, y)).await?;
                self.inner.sync.reconcile(class_id).await?;
            }
            Command::ClassUpdate { class_id, x, y } => {
                self.inner.sync.set_position(class_id.as_str(), ClassMetadata::new(x, y)).await?;
                self.publish_class(&class_id).await?;
            }
            Command::Inject {
                from_class_id,
                to_class_id,
            } => {
                self.inner
                    .mutator
                    .add_injector(&from_class_id, &to_class_id, InjectorKind::Inject)
                    .await?;
                self.inner.sync.reconcile(to_class_id).await?;
            }
            Command::InjectReplace {
                class_id,
                inject_class_id,
                property_name,
                kind,
            } => {
                self.inner
                    .mutator
                    .replace_injector(&class_id, &inject_class_id, &property_name, kind)
                    .await?;
                self.inner.sync.reconcile(class_id).await?;
            }
            Command::InjectRemove {
                from_class_id,
                to_class_id,
            } => {
                self.inner.mutator.remove_injector(&from_class_id, &to_class_id).await?;
                self.inner.sync.reconcile(to_class_id).await?;
            }
            Command::ToggleMixin { class_id, mixin } => {
                self.inner.mutator.toggle_mixin(&class_id, mixin).await?;
                self.inner.sync.reconcile(class_id).await?;
            }
            Command::ClassDelete { class_id } => self.delete_class(&class_id).await?,
            Command::ClassRename { class_id, to_class_id } => self.rename_class(&class_id, &to_class_id).await?,
            Command::ClassOpen { class_id } => self.open_class(&class_id).await?,
            Command::RunAction { instance_id, name } => self.run_action(instance_id, name)?,
        }
        Ok(Vec::new())
    }

    async fn publish_class(&self, class_id: &str) -> EditorResult<()> {
        let mut classes = self.inner.sync.snapshot().await?;
        let class = classes
            .remove(class_id)
            .ok_or_else(|| EditorError::UnknownClass(class_id.to_string()))?;
        self.publish(Event::ClassUpdate(class));
        Ok(())
    }

    async fn delete_class(&self, class_id: &str) -> EditorResult<()> {
        let classes = self.inner.sync.snapshot().await?;
        if !classes.contains_key(class_id) {
            return Err(EditorError::UnknownClass(class_id.to_string()));
        }
        for (owner, class) in &classes {
            if owner != class_id && class.extracted.depends_on(class_id) {
                self.inner.mutator.remove_injector(class_id, owner).await?;
                self.inner.sync.reconcile(owner.as_str()).await?;
            }
        }
        self.inner.mutator.delete_class(class_id).await?;
        self.inner.sync.reconcile(class_id).await?;
        Ok(())
    }

    async fn rename_class(&self, from: &str, to: &str) -> EditorResult<()> {
        let classes = self.inner.sync.snapshot().await?;
        if !classes.contains_key(from) {
            return Err(EditorError::UnknownClass(from.to_string()));
        }
        if classes.contains_key(to) {
            return Err(SourceError::ClassExists(to.to_string()).into());
        }
        // The watcher drops the position of a vanished file, so move it first
        self.inner.sync.rename_position(from, to).await?;
        if let Err(e) = self.inner.mutator.rename_class(from, to).await {
            self.inner.sync.rename_position(to, from).await?;
            return Err(e.into());
        }
        self.inner.sync.reconcile(from).await?;
        self.inner.sync.reconcile(to).await?;

        for (owner, class) in &classes {
            if owner == from {
                continue;
            }
            for injector in class.extracted.injectors.iter().filter(|i| i.class_id == from) {
                self.inner
                    .mutator
                    .replace_injector(owner, to, &injector.property_name, injector.kind)
                    .await?;
            }
            if class.extracted.depends_on(from) {
                self.inner.sync.reconcile(owner.as_str()).await?;
            }
        }
        self.publish_class(to).await
    }

    async fn open_class(&self, class_id: &str) -> EditorResult<()> {
        let path = self.inner.layout.class_path(class_id);
        match &self.inner.config.open_command {
            Some(command) => {
                tokio::process::Command::new(command)
                    .arg(&path)
                    .spawn()
                    .map_err(|source| EditorError::Open {
                        command: command.clone(),
                        source,
                    })?;
                tracing::info!(class_id = %class_id, command = %command, "opened class");
            }
            None => tracing::info!(class_id = %class_id, path = %path.display(), "no open command configured"),
        }
        Ok(())
    }

    fn run_action(&self, instance_id: InstanceId, name: String) -> EditorResult<()> {
        let program = self.inner.program.lock();
        let program = program.as_ref().ok_or(EditorError::NoRuntime)?;
        program
            .commands
            .send(RuntimeCommand::RunAction {
                instance_id,
                name,
                args: Vec::new(),
            })
            .map_err(|_| EditorError::NoRuntime)
    }
}

async fn forward_sync_events(mut changes: mpsc::UnboundedReceiver<SyncEvent>, events: broadcast::Sender<Event>) {
    while let Some(change) = changes.recv().await {
        tracing::debug!(?change, "registry changed");
        // No session connected yet is not an error
        let _ = events.send(Event::from(change));
    }
}
