//! Constructed instances

use crate::error::{RuntimeError, RuntimeResult};
use rapp_protocol::{ClassId, InstanceId};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Names of the reactive members an instance declared
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Members {
    /// Observable values and lists
    pub observables: Vec<String>,
    /// Computed values
    pub computed: Vec<String>,
    /// Actions
    pub actions: Vec<String>,
}

/// Type-erased value produced by a container
#[derive(Clone)]
pub struct Instance {
    class_id: ClassId,
    id: InstanceId,
    value: Arc<dyn Any + Send + Sync>,
    members: Arc<Members>,
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("class_id", &self.class_id)
            .field("id", &self.id)
            .field("members", &self.members)
            .finish_non_exhaustive()
    }
}

impl Instance {
    pub(crate) fn constructed(
        class_id: ClassId,
        id: InstanceId,
        value: Arc<dyn Any + Send + Sync>,
        members: Members,
    ) -> Self {
        Self {
            class_id,
            id,
            value,
            members: Arc::new(members),
        }
    }

    /// Identifier the instance was resolved under
    #[inline]
    #[must_use]
    pub fn class_id(&self) -> &str {
        &self.class_id
    }

    /// Identity assigned at construction
    #[inline]
    #[must_use]
    pub fn id(&self) -> InstanceId {
        self.id
    }

    /// Declared reactive members
    #[inline]
    #[must_use]
    pub fn members(&self) -> &Members {
        &self.members
    }

    /// Typed handle to the value
    ///
    /// # Errors
    /// Returns [`RuntimeError::TypeMismatch`] if the value is not a `T`
    pub fn downcast<T: Send + Sync + 'static>(&self) -> RuntimeResult<Arc<T>> {
        Arc::clone(&self.value)
            .downcast::<T>()
            .map_err(|_| RuntimeError::TypeMismatch {
                class_id: self.class_id.clone(),
                expected: std::any::type_name::<T>(),
            })
    }

    /// Check if both handles point at the same value
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }
}
