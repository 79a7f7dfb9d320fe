//! Message vocabulary
//!
//! Every message is adjacently tagged: `{"type": "...", "data": ...}`.

use crate::model::{BackendStatus, Class, ClassId, ExtractedClass, InjectorKind, InstanceId, Mixin};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Editor frontend → backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum Command {
    /// Request backend status and the class snapshot
    Init,
    /// Create a class placed at a position
    ClassNew {
        /// New class name
        class_id: ClassId,
        /// Horizontal position
        x: f64,
        /// Vertical position
        y: f64,
    },
    /// Move a class
    ClassUpdate {
        /// Class to move
        class_id: ClassId,
        /// Horizontal position
        x: f64,
        /// Vertical position
        y: f64,
    },
    /// Inject `from_class_id` into `to_class_id`
    Inject {
        /// Dependency source
        from_class_id: ClassId,
        /// Owning class
        to_class_id: ClassId,
    },
    /// Rewrite an existing injector property
    InjectReplace {
        /// Owning class
        class_id: ClassId,
        /// New dependency source
        inject_class_id: ClassId,
        /// Property to rewrite
        property_name: String,
        /// New resolution kind
        #[serde(rename = "injectorType")]
        kind: InjectorKind,
    },
    /// Remove the injector of `from_class_id` from `to_class_id`
    InjectRemove {
        /// Dependency source
        from_class_id: ClassId,
        /// Owning class
        to_class_id: ClassId,
    },
    /// Open the class file in an external editor
    ClassOpen {
        /// Class to open
        class_id: ClassId,
    },
    /// Run an action on a live instance
    RunAction {
        /// Target instance
        instance_id: InstanceId,
        /// Action name
        name: String,
    },
    /// Toggle a mixin on a class
    ToggleMixin {
        /// Target class
        class_id: ClassId,
        /// Mixin to toggle
        mixin: Mixin,
    },
    /// Delete a class
    ClassDelete {
        /// Class to delete
        class_id: ClassId,
    },
    /// Rename a class
    ClassRename {
        /// Current name
        class_id: ClassId,
        /// New name
        to_class_id: ClassId,
    },
}

/// Backend or runtime → editor frontend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum Event {
    /// Backend status, sent in reply to [`Command::Init`]
    Init(BackendStatus),
    /// The instrumented program disconnected
    Disconnect,
    /// Full snapshot of every class
    Classes(BTreeMap<ClassId, Class>),
    /// A class appeared on disk
    ClassNew(ExtractedClass),
    /// A class changed on disk or moved
    ClassUpdate(Class),
    /// A class disappeared from disk
    ClassDelete(ClassId),
    /// Runtime instrumentation
    App(AppMessage),
}

/// Instrumented program → backend, forwarded to the editor as [`Event::App`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum AppMessage {
    /// An instance was constructed
    Instance {
        /// Registered identifier
        class_id: ClassId,
        /// Assigned identity
        instance_id: InstanceId,
    },
    /// An injected property was resolved
    Injection {
        /// Owning class
        class_id: ClassId,
        /// Owning instance
        instance_id: InstanceId,
        /// Property that was read
        property_name: String,
        /// Dependency identifier
        inject_class_id: ClassId,
        /// Dependency instance
        inject_instance_id: InstanceId,
    },
    /// A value at `path` was set
    Update {
        /// Owning class
        class_id: ClassId,
        /// Owning instance
        instance_id: InstanceId,
        /// Path into the instance values
        path: Vec<String>,
        /// New value
        value: Value,
    },
    /// An array at `path` was spliced
    Splice {
        /// Owning class
        class_id: ClassId,
        /// Owning instance
        instance_id: InstanceId,
        /// Path of the array
        path: Vec<String>,
        /// Splice start
        index: usize,
        /// Number of removed items
        delete_count: usize,
        /// Inserted items
        items: Vec<Value>,
    },
    /// An action ran
    Action {
        /// Owning class
        class_id: ClassId,
        /// Owning instance
        instance_id: InstanceId,
        /// Action name
        name: String,
        /// Call arguments
        args: Vec<Value>,
    },
}

impl AppMessage {
    /// Class the message is attributed to
    #[must_use]
    pub fn class_id(&self) -> &str {
        match self {
            AppMessage::Instance { class_id, .. }
            | AppMessage::Injection { class_id, .. }
            | AppMessage::Update { class_id, .. }
            | AppMessage::Splice { class_id, .. }
            | AppMessage::Action { class_id, .. } => class_id,
        }
    }

    /// Instance the message is attributed to
    #[must_use]
    pub fn instance_id(&self) -> InstanceId {
        match self {
            AppMessage::Instance { instance_id, .. }
            | AppMessage::Injection { instance_id, .. }
            | AppMessage::Update { instance_id, .. }
            | AppMessage::Splice { instance_id, .. }
            | AppMessage::Action { instance_id, .. } => *instance_id,
        }
    }
}

/// Backend → instrumented program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum RuntimeCommand {
    /// Invoke a registered action on an instance
    RunAction {
        /// Target instance
        instance_id: InstanceId,
        /// Action name
        name: String,
        /// Call arguments
        #[serde(default)]
        args: Vec<Value>,
    },
}
