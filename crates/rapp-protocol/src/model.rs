//! Structural data model of the class graph
//!
//! - [`ExtractedClass`]: projection of one class source file
//! - [`ClassMetadata`]: persisted visual position
//! - [`Class`]: both of the above, the unit sent to the editor

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Unique class name, primary key into every registry
pub type ClassId = String;

/// Process-unique identity assigned to a constructed instance
pub type InstanceId = u64;

/// Reusable capability a class can opt into
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Mixin {
    /// Disposable resources
    Disposable,
    /// Async resolution
    Resolver,
    /// Finite state machine with `TState`, `state` and `transitions`
    StateMachine,
    /// UI binding
    #[allow(clippy::upper_case_acronyms)]
    UI,
}

impl Mixin {
    /// Every known mixin
    pub const ALL: [Mixin; 4] = [
        Mixin::Disposable,
        Mixin::Resolver,
        Mixin::StateMachine,
        Mixin::UI,
    ];

    /// Interface name as written in source
    #[inline]
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Mixin::Disposable => "Disposable",
            Mixin::Resolver => "Resolver",
            Mixin::StateMachine => "StateMachine",
            Mixin::UI => "UI",
        }
    }

    /// Look up a mixin by its interface name
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|mixin| mixin.name() == name)
    }
}

impl fmt::Display for Mixin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How an injected dependency is resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InjectorKind {
    /// Singleton resolution through `inject("Id")`
    Inject,
    /// Factory resolution through `injectFactory("Id")`
    InjectFactory,
}

impl InjectorKind {
    /// Decorator name that marks this kind in source
    #[inline]
    #[must_use]
    pub fn decorator(self) -> &'static str {
        match self {
            InjectorKind::Inject => "inject",
            InjectorKind::InjectFactory => "injectFactory",
        }
    }

    /// Parse a decorator name
    #[must_use]
    pub fn from_decorator(name: &str) -> Option<Self> {
        match name {
            "inject" => Some(InjectorKind::Inject),
            "injectFactory" => Some(InjectorKind::InjectFactory),
            _ => None,
        }
    }

    /// Default property name for a dependency on `class_id`
    ///
    /// `inject` uses the class id with a lower-cased first letter,
    /// `injectFactory` prefixes it with `create`.
    #[must_use]
    pub fn property_name(self, class_id: &str) -> String {
        match self {
            InjectorKind::Inject => {
                let mut chars = class_id.chars();
                match chars.next() {
                    Some(first) => first.to_lowercase().chain(chars).collect(),
                    None => String::new(),
                }
            }
            InjectorKind::InjectFactory => format!("create{class_id}"),
        }
    }
}

/// Declared dependency edge, materialized as an annotated property
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Injector {
    /// Dependency source class
    pub class_id: ClassId,
    /// Property on the owning class
    pub property_name: String,
    /// Resolution kind
    #[serde(rename = "type")]
    pub kind: InjectorKind,
}

impl Injector {
    /// Create injector
    #[inline]
    #[must_use]
    pub fn new(class_id: impl Into<ClassId>, property_name: impl Into<String>, kind: InjectorKind) -> Self {
        Self {
            class_id: class_id.into(),
            property_name: property_name.into(),
            kind,
        }
    }
}

/// Member marked `@observable`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Observable {
    /// Member name
    pub name: String,
}

/// Getter marked `@computed`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Computed {
    /// Member name
    pub name: String,
}

/// Method marked `@action`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Action {
    /// Member name
    pub name: String,
}

/// Structural projection of one class source file
///
/// Superseded wholesale on every re-extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedClass {
    /// Class name
    pub class_id: ClassId,
    /// Applied mixins
    pub mixins: BTreeSet<Mixin>,
    /// Injectors in declaration order
    pub injectors: Vec<Injector>,
    /// Observables in declaration order
    pub observables: Vec<Observable>,
    /// Computed getters in declaration order
    pub computed: Vec<Computed>,
    /// Actions in declaration order
    pub actions: Vec<Action>,
}

impl ExtractedClass {
    /// Empty class with no members
    #[must_use]
    pub fn new(class_id: impl Into<ClassId>) -> Self {
        Self {
            class_id: class_id.into(),
            mixins: BTreeSet::new(),
            injectors: Vec::new(),
            observables: Vec::new(),
            computed: Vec::new(),
            actions: Vec::new(),
        }
    }

    /// Find the injector stored under `property_name`
    #[must_use]
    pub fn injector(&self, property_name: &str) -> Option<&Injector> {
        self.injectors
            .iter()
            .find(|injector| injector.property_name == property_name)
    }

    /// Whether any injector depends on `class_id`
    #[must_use]
    pub fn depends_on(&self, class_id: &str) -> bool {
        self.injectors.iter().any(|injector| injector.class_id == class_id)
    }
}

/// Visual position of a class node
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassMetadata {
    /// Horizontal position
    pub x: f64,
    /// Vertical position
    pub y: f64,
}

impl ClassMetadata {
    /// Create metadata at position
    #[inline]
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Extracted class merged with its position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Class {
    /// Structural part
    #[serde(flatten)]
    pub extracted: ExtractedClass,
    /// Horizontal position
    pub x: f64,
    /// Vertical position
    pub y: f64,
}

impl Class {
    /// Merge extraction and metadata
    #[must_use]
    pub fn new(extracted: ExtractedClass, metadata: ClassMetadata) -> Self {
        Self {
            extracted,
            x: metadata.x,
            y: metadata.y,
        }
    }

    /// Class name
    #[inline]
    #[must_use]
    pub fn class_id(&self) -> &str {
        &self.extracted.class_id
    }

    /// Position part
    #[inline]
    #[must_use]
    pub fn metadata(&self) -> ClassMetadata {
        ClassMetadata::new(self.x, self.y)
    }
}

/// State of the project the backend serves
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum BackendStatus {
    /// Not yet determined
    Pending,
    /// No `package.json` in the project root
    NoProject,
    /// `package.json` does not depend on the library
    MissingDependencies {
        /// Project root
        path: String,
    },
    /// Project is ready to edit
    Ready {
        /// Project root
        path: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixin_names_round_trip() {
        for mixin in Mixin::ALL {
            assert_eq!(Mixin::from_name(mixin.name()), Some(mixin));
        }
        assert_eq!(Mixin::from_name("Serializable"), None);
    }

    #[test]
    fn property_names_follow_kind() {
        assert_eq!(InjectorKind::Inject.property_name("UserService"), "userService");
        assert_eq!(
            InjectorKind::InjectFactory.property_name("UserService"),
            "createUserService"
        );
        assert_eq!(InjectorKind::Inject.property_name(""), "");
    }

    #[test]
    fn depends_on_checks_injector_sources() {
        let mut class = ExtractedClass::new("B");
        class
            .injectors
            .push(Injector::new("A", "a", InjectorKind::Inject));
        assert!(class.depends_on("A"));
        assert!(!class.depends_on("C"));
        assert_eq!(class.injector("a").map(|i| i.kind), Some(InjectorKind::Inject));
    }
}
