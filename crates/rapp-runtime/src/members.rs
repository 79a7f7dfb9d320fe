//! Reactive members of constructed instances
//!
//! Handles are created through [`crate::ConstructionContext`] and are cheap
//! to clone; clones share state. Every mutation is reported attributed to
//! the owning instance.

use crate::error::RuntimeResult;
use crate::reporter::Reporter;
use parking_lot::RwLock;
use rapp_protocol::{AppMessage, ClassId, InstanceId};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Owner attribution for reported events
#[derive(Clone)]
pub(crate) struct Sink {
    reporter: Option<Arc<dyn Reporter>>,
    class_id: ClassId,
    instance_id: InstanceId,
}

impl Sink {
    pub(crate) fn new(reporter: Option<Arc<dyn Reporter>>, class_id: ClassId, instance_id: InstanceId) -> Self {
        Self {
            reporter,
            class_id,
            instance_id,
        }
    }

    pub(crate) fn emit(&self, build: impl FnOnce(ClassId, InstanceId) -> AppMessage) {
        if let Some(reporter) = &self.reporter {
            reporter.report(build(self.class_id.clone(), self.instance_id));
        }
    }

    fn enabled(&self) -> bool {
        self.reporter.is_some()
    }
}

impl fmt::Debug for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sink")
            .field("class_id", &self.class_id)
            .field("instance_id", &self.instance_id)
            .field("reporting", &self.enabled())
            .finish()
    }
}

fn to_value<T: Serialize>(name: &str, value: &T) -> Option<Value> {
    match serde_json::to_value(value) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(member = %name, error = %e, "value is not reportable");
            None
        }
    }
}

/// Member reporting its current value once construction completes
pub(crate) trait Activate: Send + Sync {
    fn activate(&self);
}

/// Observable scalar or record value
pub struct Observable<T> {
    name: Arc<str>,
    value: Arc<RwLock<T>>,
    sink: Sink,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            value: Arc::clone(&self.value),
            sink: self.sink.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("name", &self.name)
            .field("value", &*self.value.read())
            .finish()
    }
}

impl<T: Clone + Serialize + Send + Sync + 'static> Observable<T> {
    pub(crate) fn new(name: &str, initial: T, sink: Sink) -> Self {
        Self {
            name: Arc::from(name),
            value: Arc::new(RwLock::new(initial)),
            sink,
        }
    }

    /// Member name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current value
    #[must_use]
    pub fn get(&self) -> T {
        self.value.read().clone()
    }

    /// Replace the value
    pub fn set(&self, value: T) {
        *self.value.write() = value;
        self.report();
    }

    /// Mutate the value in place
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        f(&mut self.value.write());
        self.report();
    }

    fn report(&self) {
        if !self.sink.enabled() {
            return;
        }
        let Some(value) = to_value(&self.name, &*self.value.read()) else {
            return;
        };
        let path = vec![self.name.to_string()];
        self.sink.emit(|class_id, instance_id| AppMessage::Update {
            class_id,
            instance_id,
            path,
            value,
        });
    }
}

impl<T: Clone + Serialize + Send + Sync + 'static> Activate for Observable<T> {
    fn activate(&self) {
        self.report();
    }
}

/// Observable list reporting splices
pub struct ObservableVec<T> {
    name: Arc<str>,
    items: Arc<RwLock<Vec<T>>>,
    sink: Sink,
}

impl<T> Clone for ObservableVec<T> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            items: Arc::clone(&self.items),
            sink: self.sink.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ObservableVec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableVec")
            .field("name", &self.name)
            .field("items", &*self.items.read())
            .finish()
    }
}

impl<T: Clone + Serialize + Send + Sync + 'static> ObservableVec<T> {
    pub(crate) fn new(name: &str, initial: Vec<T>, sink: Sink) -> Self {
        Self {
            name: Arc::from(name),
            items: Arc::new(RwLock::new(initial)),
            sink,
        }
    }

    /// Member name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Copy of the items
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.items.read().clone()
    }

    /// Number of items
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    /// Check if the list is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    /// Append an item
    pub fn push(&self, item: T) {
        let index = self.len();
        self.splice(index, 0, vec![item]);
    }

    /// Remove `delete_count` items at `index` and insert `items` there
    ///
    /// Out-of-range bounds are clamped. Returns the removed items.
    pub fn splice(&self, index: usize, delete_count: usize, items: Vec<T>) -> Vec<T> {
        let (index, delete_count, removed) = {
            let mut list = self.items.write();
            let index = index.min(list.len());
            let end = index.saturating_add(delete_count).min(list.len());
            let removed: Vec<T> = list.splice(index..end, items.iter().cloned()).collect();
            (index, end - index, removed)
        };

        if self.sink.enabled() {
            let reported: Option<Vec<Value>> = items.iter().map(|item| to_value(&self.name, item)).collect();
            if let Some(items) = reported {
                let path = vec![self.name.to_string()];
                self.sink.emit(|class_id, instance_id| AppMessage::Splice {
                    class_id,
                    instance_id,
                    path,
                    index,
                    delete_count,
                    items,
                });
            }
        }
        removed
    }

    /// Remove the item at `index`
    pub fn remove(&self, index: usize) -> Option<T> {
        self.splice(index, 1, Vec::new()).into_iter().next()
    }
}

impl<T: Clone + Serialize + Send + Sync + 'static> Activate for ObservableVec<T> {
    fn activate(&self) {
        if !self.sink.enabled() {
            return;
        }
        let Some(value) = to_value(&self.name, &*self.items.read()) else {
            return;
        };
        let path = vec![self.name.to_string()];
        self.sink.emit(|class_id, instance_id| AppMessage::Update {
            class_id,
            instance_id,
            path,
            value,
        });
    }
}

/// Derived value recomputed on every read
pub struct Computed<T> {
    name: Arc<str>,
    compute: Arc<dyn Fn() -> T + Send + Sync>,
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            compute: Arc::clone(&self.compute),
        }
    }
}

impl<T> fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed").field("name", &self.name).finish_non_exhaustive()
    }
}

impl<T> Computed<T> {
    pub(crate) fn new(name: &str, compute: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Self {
            name: Arc::from(name),
            compute: Arc::new(compute),
        }
    }

    /// Member name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current value
    #[must_use]
    pub fn get(&self) -> T {
        (self.compute)()
    }
}

type ActionFn = dyn Fn(&[Value]) -> RuntimeResult<()> + Send + Sync;

/// Named action reporting each invocation
#[derive(Clone)]
pub struct ActionHandle {
    name: Arc<str>,
    handler: Arc<ActionFn>,
    sink: Sink,
}

impl fmt::Debug for ActionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionHandle")
            .field("name", &self.name)
            .field("sink", &self.sink)
            .finish_non_exhaustive()
    }
}

impl ActionHandle {
    pub(crate) fn new(
        name: &str,
        handler: impl Fn(&[Value]) -> RuntimeResult<()> + Send + Sync + 'static,
        sink: Sink,
    ) -> Self {
        Self {
            name: Arc::from(name),
            handler: Arc::new(handler),
            sink,
        }
    }

    /// Action name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Report the call, then run the handler
    ///
    /// # Errors
    /// Propagates the handler's error
    pub fn call(&self, args: &[Value]) -> RuntimeResult<()> {
        let name = self.name.to_string();
        let reported = args.to_vec();
        self.sink.emit(|class_id, instance_id| AppMessage::Action {
            class_id,
            instance_id,
            name,
            args: reported,
        });
        (self.handler)(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::MockReporter;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sink(reporter: MockReporter) -> Sink {
        Sink::new(Some(Arc::new(reporter)), "List".into(), 7)
    }

    #[test]
    fn splice_reports_clamped_bounds() {
        let mut reporter = MockReporter::new();
        reporter
            .expect_report()
            .withf(|message| {
                *message
                    == AppMessage::Splice {
                        class_id: "List".into(),
                        instance_id: 7,
                        path: vec!["items".into()],
                        index: 2,
                        delete_count: 1,
                        items: vec![json!(9)],
                    }
            })
            .times(1)
            .return_const(());

        let list = ObservableVec::new("items", vec![1, 2, 3], sink(reporter));
        let removed = list.splice(2, 5, vec![9]);
        assert_eq!(removed, vec![3]);
        assert_eq!(list.to_vec(), vec![1, 2, 9]);
    }

    #[test]
    fn set_reports_full_value() {
        let mut reporter = MockReporter::new();
        reporter
            .expect_report()
            .withf(|message| matches!(message, AppMessage::Update { path, value, .. } if path == &["count"] && value == &json!(5)))
            .times(1)
            .return_const(());

        let count = Observable::new("count", 0, sink(reporter));
        count.set(5);
        assert_eq!(count.get(), 5);
    }

    #[test]
    fn members_without_reporter_stay_silent() {
        let silent = Sink::new(None, "A".into(), 1);
        let list = ObservableVec::new("items", Vec::<i32>::new(), silent.clone());
        list.push(1);
        let action = ActionHandle::new("noop", |_| Ok(()), silent);
        action.call(&[]).unwrap();
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn computed_reads_through() {
        let silent = Sink::new(None, "A".into(), 1);
        let count = Observable::new("count", 2, silent);
        let double = {
            let count = count.clone();
            Computed::new("double", move || count.get() * 2)
        };
        count.set(21);
        assert_eq!(double.get(), 42);
    }
}
