//! Two-phase construction
//!
//! The container allocates an identity first, then runs the user's
//! constructor with a [`ConstructionContext`] carrying it. Every member the
//! constructor declares through the context is attributed to that identity
//! from its first event on.

use crate::container::{Container, ContainerInner};
use crate::error::{RuntimeError, RuntimeResult};
use crate::instance::Members;
use crate::members::{Activate, ActionHandle, Computed, Observable, ObservableVec, Sink};
use once_cell::sync::OnceCell;
use rapp_protocol::{ClassId, InstanceId};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Weak};

/// Construction state of one instance
pub struct ConstructionContext<'c> {
    container: &'c Container,
    class_id: ClassId,
    instance_id: InstanceId,
    sink: Sink,
    members: Members,
    activations: Vec<Box<dyn Activate>>,
    actions: Vec<ActionHandle>,
}

impl fmt::Debug for ConstructionContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructionContext")
            .field("class_id", &self.class_id)
            .field("instance_id", &self.instance_id)
            .field("members", &self.members)
            .finish_non_exhaustive()
    }
}

impl<'c> ConstructionContext<'c> {
    pub(crate) fn new(container: &'c Container, class_id: &str, instance_id: InstanceId) -> Self {
        Self {
            container,
            class_id: class_id.to_string(),
            instance_id,
            sink: Sink::new(container.reporter(), class_id.to_string(), instance_id),
            members: Members::default(),
            activations: Vec::new(),
            actions: Vec::new(),
        }
    }

    /// Identifier being constructed
    #[inline]
    #[must_use]
    pub fn class_id(&self) -> &str {
        &self.class_id
    }

    /// Identity assigned to the instance
    #[inline]
    #[must_use]
    pub fn instance_id(&self) -> InstanceId {
        self.instance_id
    }

    /// Container constructing the instance
    #[inline]
    #[must_use]
    pub fn container(&self) -> &Container {
        self.container
    }

    fn binding(&self) -> Binding {
        Binding {
            container: self.container.downgrade(),
            class_id: self.class_id.clone(),
            instance_id: self.instance_id,
        }
    }

    /// Declare a property resolving `source` as a singleton on first read
    pub fn inject<T>(&mut self, property_name: &str, source: &str) -> Inject<T> {
        Inject {
            property_name: property_name.to_string(),
            source: source.to_string(),
            binding: Some(self.binding()),
            resolved: OnceCell::new(),
        }
    }

    /// Declare a property constructing a fresh `source` on every call
    pub fn inject_factory<T>(&mut self, property_name: &str, source: &str) -> InjectFactory<T> {
        InjectFactory {
            property_name: property_name.to_string(),
            source: source.to_string(),
            binding: Some(self.binding()),
            _marker: std::marker::PhantomData,
        }
    }

    /// Declare an observable value
    pub fn observable<T>(&mut self, name: &str, initial: T) -> Observable<T>
    where
        T: Clone + Serialize + Send + Sync + 'static,
    {
        let observable = Observable::new(name, initial, self.sink.clone());
        self.members.observables.push(name.to_string());
        self.activations.push(Box::new(observable.clone()));
        observable
    }

    /// Declare an observable list
    pub fn observable_vec<T>(&mut self, name: &str, initial: Vec<T>) -> ObservableVec<T>
    where
        T: Clone + Serialize + Send + Sync + 'static,
    {
        let list = ObservableVec::new(name, initial, self.sink.clone());
        self.members.observables.push(name.to_string());
        self.activations.push(Box::new(list.clone()));
        list
    }

    /// Declare a computed value
    pub fn computed<T>(&mut self, name: &str, compute: impl Fn() -> T + Send + Sync + 'static) -> Computed<T> {
        self.members.computed.push(name.to_string());
        Computed::new(name, compute)
    }

    /// Declare an action, also runnable through [`Container::run_action`]
    pub fn action(
        &mut self,
        name: &str,
        handler: impl Fn(&[Value]) -> RuntimeResult<()> + Send + Sync + 'static,
    ) -> ActionHandle {
        let action = ActionHandle::new(name, handler, self.sink.clone());
        self.members.actions.push(name.to_string());
        self.actions.push(action.clone());
        action
    }

    pub(crate) fn finish(self) -> (Members, Vec<Box<dyn Activate>>, Vec<ActionHandle>) {
        (self.members, self.activations, self.actions)
    }
}

/// Owner of an injected property
#[derive(Clone)]
struct Binding {
    container: Weak<ContainerInner>,
    class_id: ClassId,
    instance_id: InstanceId,
}

impl Binding {
    fn resolve<'b>(binding: Option<&'b Self>, property_name: &str) -> RuntimeResult<(Container, &'b Self)> {
        let outside = || RuntimeError::InjectionOutsideContainer {
            property_name: property_name.to_string(),
        };
        let binding = binding.ok_or_else(outside)?;
        let container = Container::upgrade(&binding.container).ok_or_else(outside)?;
        Ok((container, binding))
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("class_id", &self.class_id)
            .field("instance_id", &self.instance_id)
            .finish_non_exhaustive()
    }
}

/// Lazily resolved singleton dependency
///
/// The first successful read resolves and caches the dependency and reports
/// the injection; later reads return the cached value.
pub struct Inject<T> {
    property_name: String,
    source: ClassId,
    binding: Option<Binding>,
    resolved: OnceCell<Arc<T>>,
}

impl<T> fmt::Debug for Inject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inject")
            .field("property_name", &self.property_name)
            .field("source", &self.source)
            .field("resolved", &self.resolved.get().is_some())
            .finish()
    }
}

impl<T: Send + Sync + 'static> Inject<T> {
    /// Create a property not owned by any container
    ///
    /// Reading it fails with [`RuntimeError::InjectionOutsideContainer`].
    #[must_use]
    pub fn unbound(property_name: impl Into<String>, source: impl Into<ClassId>) -> Self {
        Self {
            property_name: property_name.into(),
            source: source.into(),
            binding: None,
            resolved: OnceCell::new(),
        }
    }

    /// Property name on the owning class
    #[inline]
    #[must_use]
    pub fn property_name(&self) -> &str {
        &self.property_name
    }

    /// Dependency identifier
    #[inline]
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Resolve the dependency
    ///
    /// # Errors
    /// Returns [`RuntimeError::InjectionOutsideContainer`] for unbound
    /// properties, or any resolution error of the dependency
    pub fn get(&self) -> RuntimeResult<Arc<T>> {
        self.resolved
            .get_or_try_init(|| {
                let (container, binding) = Binding::resolve(self.binding.as_ref(), &self.property_name)?;
                let instance = container.get_singleton(&self.source)?;
                let value = instance.downcast::<T>()?;
                container.report_injection(binding.class_id.clone(), binding.instance_id, &self.property_name, &instance);
                Ok(value)
            })
            .map(Arc::clone)
    }
}

/// Factory dependency constructing a fresh instance per call
pub struct InjectFactory<T> {
    property_name: String,
    source: ClassId,
    binding: Option<Binding>,
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T> fmt::Debug for InjectFactory<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InjectFactory")
            .field("property_name", &self.property_name)
            .field("source", &self.source)
            .finish()
    }
}

impl<T: Send + Sync + 'static> InjectFactory<T> {
    /// Create a factory property not owned by any container
    #[must_use]
    pub fn unbound(property_name: impl Into<String>, source: impl Into<ClassId>) -> Self {
        Self {
            property_name: property_name.into(),
            source: source.into(),
            binding: None,
            _marker: std::marker::PhantomData,
        }
    }

    /// Property name on the owning class
    #[inline]
    #[must_use]
    pub fn property_name(&self) -> &str {
        &self.property_name
    }

    /// Construct a new dependency instance, reporting the injection
    ///
    /// # Errors
    /// Returns [`RuntimeError::InjectionOutsideContainer`] for unbound
    /// properties, or any construction error of the dependency
    pub fn create(&self, args: &[Value]) -> RuntimeResult<Arc<T>> {
        let (container, binding) = Binding::resolve(self.binding.as_ref(), &self.property_name)?;
        let instance = container.get(&self.source, args)?;
        let value = instance.downcast::<T>()?;
        container.report_injection(binding.class_id.clone(), binding.instance_id, &self.property_name, &instance);
        Ok(value)
    }
}
