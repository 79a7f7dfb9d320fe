//! Instrumented dependency container
//!
//! Identifiers map to class constructors or factory functions. Constructing
//! a class assigns it the next identity, runs its constructor with a
//! [`ConstructionContext`], activates its declared members and reports the
//! new instance.

use crate::context::ConstructionContext;
use crate::error::{RuntimeError, RuntimeResult};
use crate::instance::{Instance, Members};
use crate::members::ActionHandle;
use crate::reporter::{Reporter, TcpReporter};
use crossbeam::channel::Receiver;
use once_cell::sync::OnceCell;
use parking_lot::{Mutex, RwLock};
use rapp_protocol::{AppMessage, ClassId, InstanceId, RuntimeCommand};
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread;

type Erased = Arc<dyn Any + Send + Sync>;
type ClassFn = dyn Fn(&mut ConstructionContext<'_>, &[Value]) -> RuntimeResult<Erased> + Send + Sync;
type FactoryFn = dyn Fn(&Container, &[Value]) -> RuntimeResult<Erased> + Send + Sync;

#[derive(Clone)]
enum Registration {
    Class(Arc<ClassFn>),
    Factory(Arc<FactoryFn>),
}

/// Builder collecting registrations and the reporting setup
#[derive(Default)]
pub struct ContainerBuilder {
    registrations: HashMap<ClassId, Registration>,
    reporter: Option<Arc<dyn Reporter>>,
    devtool: Option<String>,
}

impl fmt::Debug for ContainerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerBuilder")
            .field("registrations", &self.registrations.keys().collect::<Vec<_>>())
            .field("reporter", &self.reporter.is_some())
            .field("devtool", &self.devtool)
            .finish()
    }
}

impl ContainerBuilder {
    /// Create empty builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class constructor under `id`
    #[must_use]
    pub fn register_class<T, F>(mut self, id: impl Into<ClassId>, constructor: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&mut ConstructionContext<'_>, &[Value]) -> RuntimeResult<T> + Send + Sync + 'static,
    {
        let constructor: Arc<ClassFn> =
            Arc::new(move |cx: &mut ConstructionContext<'_>, args: &[Value]| {
                constructor(cx, args).map(|value| Arc::new(value) as Erased)
            });
        self.registrations.insert(id.into(), Registration::Class(constructor));
        self
    }

    /// Register a factory function under `id`
    ///
    /// Every result is assigned an identity and reported like a constructed
    /// class; it declares no reactive members.
    #[must_use]
    pub fn register_factory<T, F>(mut self, id: impl Into<ClassId>, factory: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Container, &[Value]) -> RuntimeResult<T> + Send + Sync + 'static,
    {
        let factory: Arc<FactoryFn> = Arc::new(move |container: &Container, args: &[Value]| {
            factory(container, args).map(|value| Arc::new(value) as Erased)
        });
        self.registrations.insert(id.into(), Registration::Factory(factory));
        self
    }

    /// Report to a custom reporter
    #[must_use]
    pub fn reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Report to the devtool at `host:port`
    ///
    /// An unreachable devtool disables reporting.
    #[must_use]
    pub fn devtool(mut self, address: impl Into<String>) -> Self {
        self.devtool = Some(address.into());
        self
    }

    /// Build the container
    #[must_use]
    pub fn build(self) -> Container {
        let mut commands = None;
        let reporter = match (self.reporter, self.devtool) {
            (Some(reporter), _) => Some(reporter),
            (None, Some(address)) => match TcpReporter::connect(&address) {
                Ok((reporter, received)) => {
                    commands = Some(received);
                    Some(Arc::new(reporter) as Arc<dyn Reporter>)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "instrumentation disabled");
                    None
                }
            },
            (None, None) => None,
        };

        let container = Container {
            inner: Arc::new(ContainerInner {
                registrations: self.registrations,
                reporter,
                next_id: AtomicU64::new(1),
                singletons: Mutex::new(HashMap::new()),
                actions: RwLock::new(ActionTable::default()),
            }),
        };
        if let Some(commands) = commands {
            container.serve_commands(commands);
        }
        container
    }
}

pub(crate) struct ContainerInner {
    registrations: HashMap<ClassId, Registration>,
    reporter: Option<Arc<dyn Reporter>>,
    next_id: AtomicU64,
    singletons: Mutex<HashMap<ClassId, Arc<OnceCell<Instance>>>>,
    actions: RwLock<ActionTable>,
}

const PRUNE_FLOOR: usize = 64;

/// Actions of live instances, keyed by identity
///
/// Entries hold only a weak reference to their instance; dropped instances
/// are pruned whenever the table doubles past its last pruned size.
#[derive(Default)]
struct ActionTable {
    entries: HashMap<InstanceId, LiveActions>,
    prune_at: usize,
}

struct LiveActions {
    owner: Weak<dyn Any + Send + Sync>,
    actions: Vec<ActionHandle>,
}

impl ActionTable {
    fn insert(&mut self, instance_id: InstanceId, owner: &Erased, actions: Vec<ActionHandle>) {
        if self.entries.len() >= self.prune_at.max(PRUNE_FLOOR) {
            self.prune();
        }
        self.entries.insert(
            instance_id,
            LiveActions {
                owner: Arc::downgrade(owner),
                actions,
            },
        );
    }

    fn prune(&mut self) {
        self.entries.retain(|_, live| live.owner.strong_count() > 0);
        self.prune_at = self.entries.len() * 2;
    }

    fn find(&mut self, instance_id: InstanceId, name: &str) -> Option<ActionHandle> {
        let live = self.entries.get(&instance_id)?;
        if live.owner.strong_count() == 0 {
            self.entries.remove(&instance_id);
            return None;
        }
        live.actions.iter().find(|a| a.name() == name).cloned()
    }
}

/// Shared handle to a container
#[derive(Clone)]
pub struct Container {
    inner: Arc<ContainerInner>,
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("registrations", &self.inner.registrations.len())
            .field("reporting", &self.inner.reporter.is_some())
            .field("next_id", &self.inner.next_id.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl Container {
    /// Start building a container
    #[must_use]
    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::new()
    }

    pub(crate) fn downgrade(&self) -> Weak<ContainerInner> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn upgrade(inner: &Weak<ContainerInner>) -> Option<Self> {
        inner.upgrade().map(|inner| Self { inner })
    }

    pub(crate) fn reporter(&self) -> Option<Arc<dyn Reporter>> {
        self.inner.reporter.clone()
    }

    /// Check if `id` is registered
    #[inline]
    #[must_use]
    pub fn is_registered(&self, id: &str) -> bool {
        self.inner.registrations.contains_key(id)
    }

    /// Check if instrumentation is enabled
    #[inline]
    #[must_use]
    pub fn is_reporting(&self) -> bool {
        self.inner.reporter.is_some()
    }

    fn registration(&self, id: &str) -> RuntimeResult<Registration> {
        self.inner
            .registrations
            .get(id)
            .cloned()
            .ok_or_else(|| RuntimeError::UnregisteredIdentifier(id.to_string()))
    }

    /// Construct a new instance of `id`
    ///
    /// # Errors
    /// Returns [`RuntimeError::UnregisteredIdentifier`] for unknown ids, or
    /// the constructor's error
    pub fn get(&self, id: &str, args: &[Value]) -> RuntimeResult<Instance> {
        match self.registration(id)? {
            Registration::Class(constructor) => self.construct(id, constructor.as_ref(), args),
            Registration::Factory(factory) => {
                let instance_id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
                let value = factory(self, args)?;
                self.report(AppMessage::Instance {
                    class_id: id.to_string(),
                    instance_id,
                });
                tracing::trace!(class_id = %id, instance_id, "produced instance");
                Ok(Instance::constructed(id.to_string(), instance_id, value, Members::default()))
            }
        }
    }

    fn construct(&self, id: &str, constructor: &ClassFn, args: &[Value]) -> RuntimeResult<Instance> {
        let instance_id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let mut cx = ConstructionContext::new(self, id, instance_id);
        let value = constructor(&mut cx, args)?;
        let (members, activations, actions) = cx.finish();

        for member in &activations {
            member.activate();
        }
        if !actions.is_empty() {
            self.inner.actions.write().insert(instance_id, &value, actions);
        }
        self.report(AppMessage::Instance {
            class_id: id.to_string(),
            instance_id,
        });
        tracing::trace!(class_id = %id, instance_id, "constructed instance");
        Ok(Instance::constructed(id.to_string(), instance_id, value, members))
    }

    /// Instance of `id` shared for the container's lifetime
    ///
    /// # Errors
    /// Returns [`RuntimeError::UnregisteredIdentifier`] for unknown ids, or
    /// the constructor's error; a failed construction is retried on the
    /// next call
    pub fn get_singleton(&self, id: &str) -> RuntimeResult<Instance> {
        if !self.is_registered(id) {
            return Err(RuntimeError::UnregisteredIdentifier(id.to_string()));
        }
        let cell = Arc::clone(self.inner.singletons.lock().entry(id.to_string()).or_default());
        cell.get_or_try_init(|| self.get(id, &[])).cloned()
    }

    /// Function constructing a fresh instance of `id` per call
    #[must_use]
    pub fn get_factory(&self, id: &str) -> Factory {
        Factory {
            container: self.clone(),
            class_id: id.to_string(),
        }
    }

    /// Run a declared action of a live instance
    ///
    /// # Errors
    /// Returns [`RuntimeError::UnknownAction`] if the instance declared no
    /// such action or has been dropped, or the action's error
    pub fn run_action(&self, instance_id: InstanceId, name: &str, args: &[Value]) -> RuntimeResult<()> {
        let action = self
            .inner
            .actions
            .write()
            .find(instance_id, name)
            .ok_or_else(|| RuntimeError::UnknownAction {
                instance_id,
                name: name.to_string(),
            })?;
        action.call(args)
    }

    /// Run commands sent back by the devtool on a background thread
    ///
    /// The thread ends when the channel closes or the container is dropped.
    pub fn serve_commands(&self, commands: Receiver<RuntimeCommand>) {
        let weak = self.downgrade();
        let spawned = thread::Builder::new()
            .name("rapp-devtool-commands".into())
            .spawn(move || {
                for command in commands {
                    let Some(container) = Container::upgrade(&weak) else {
                        return;
                    };
                    match command {
                        RuntimeCommand::RunAction {
                            instance_id,
                            name,
                            args,
                        } => {
                            if let Err(e) = container.run_action(instance_id, &name, &args) {
                                tracing::warn!(instance_id, action = %name, error = %e, "devtool action failed");
                            }
                        }
                    }
                }
            });
        if let Err(e) = spawned {
            tracing::warn!(error = %e, "devtool commands disabled");
        }
    }

    fn report(&self, message: AppMessage) {
        if let Some(reporter) = &self.inner.reporter {
            reporter.report(message);
        }
    }

    pub(crate) fn report_injection(
        &self,
        class_id: ClassId,
        instance_id: InstanceId,
        property_name: &str,
        dependency: &Instance,
    ) {
        self.report(AppMessage::Injection {
            class_id,
            instance_id,
            property_name: property_name.to_string(),
            inject_class_id: dependency.class_id().to_string(),
            inject_instance_id: dependency.id(),
        });
    }
}

/// Bound constructor returned by [`Container::get_factory`]
#[derive(Debug, Clone)]
pub struct Factory {
    container: Container,
    class_id: ClassId,
}

impl Factory {
    /// Identifier this factory constructs
    #[inline]
    #[must_use]
    pub fn class_id(&self) -> &str {
        &self.class_id
    }

    /// Construct a fresh instance
    ///
    /// # Errors
    /// Same as [`Container::get`]
    pub fn create(&self, args: &[Value]) -> RuntimeResult<Instance> {
        self.container.get(&self.class_id, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::MockReporter;
    use mockall::Sequence;

    struct Plain;

    #[test]
    fn instance_event_follows_initial_values() {
        let mut reporter = MockReporter::new();
        let mut seq = Sequence::new();
        reporter
            .expect_report()
            .withf(|m| matches!(m, AppMessage::Update { instance_id: 1, .. }))
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        reporter
            .expect_report()
            .withf(|m| matches!(m, AppMessage::Instance { instance_id: 1, .. }))
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());

        let container = Container::builder()
            .reporter(Arc::new(reporter))
            .register_class("Counter", |cx, _| Ok(cx.observable("count", 0)))
            .build();
        container.get("Counter", &[]).unwrap();
    }

    #[test]
    fn factory_results_get_an_identity() {
        let mut reporter = MockReporter::new();
        reporter
            .expect_report()
            .withf(|m| matches!(m, AppMessage::Instance { class_id, instance_id: 1 } if class_id == "Plain"))
            .times(1)
            .return_const(());

        let container = Container::builder()
            .reporter(Arc::new(reporter))
            .register_factory("Plain", |_, _| Ok(Plain))
            .build();
        let instance = container.get("Plain", &[]).unwrap();
        assert_eq!(instance.id(), 1);
        assert!(instance.members().actions.is_empty());
        assert!(instance.downcast::<Plain>().is_ok());
    }

    struct Clicker {
        _click: ActionHandle,
    }

    fn clicker(cx: &mut ConstructionContext<'_>) -> Clicker {
        Clicker {
            _click: cx.action("click", |_| Ok(())),
        }
    }

    #[test]
    fn dropped_instances_release_their_actions() {
        let container = Container::builder()
            .register_class("Clicker", |cx, _| Ok(clicker(cx)))
            .build();
        let kept = container.get("Clicker", &[]).unwrap();
        let dropped = container.get("Clicker", &[]).unwrap();
        let dropped_id = dropped.id();
        drop(dropped);

        container.run_action(kept.id(), "click", &[]).unwrap();
        assert!(matches!(
            container.run_action(dropped_id, "click", &[]),
            Err(RuntimeError::UnknownAction { .. })
        ));
        assert_eq!(container.inner.actions.read().entries.len(), 1);
    }

    #[test]
    fn action_table_prunes_as_it_grows() {
        let container = Container::builder()
            .register_class("Clicker", |cx, _| Ok(clicker(cx)))
            .build();
        for _ in 0..(PRUNE_FLOOR * 4) {
            container.get("Clicker", &[]).unwrap();
        }
        assert!(container.inner.actions.read().entries.len() <= PRUNE_FLOOR);
    }

    #[test]
    fn unknown_action_is_reported_as_error() {
        let container = Container::builder()
            .register_class("Plain", |_, _| Ok(Plain))
            .build();
        let instance = container.get("Plain", &[]).unwrap();
        let err = container.run_action(instance.id(), "missing", &[]).unwrap_err();
        assert!(matches!(err, RuntimeError::UnknownAction { .. }));
    }
}
