//! In-memory class registry

use crate::metadata::MetadataStore;
use rapp_protocol::{Class, ClassId, ExtractedClass};
use std::collections::BTreeMap;

/// Latest extraction of every class file
#[derive(Debug, Clone, Default)]
pub struct ClassRegistry {
    classes: BTreeMap<ClassId, ExtractedClass>,
}

impl ClassRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an extraction, returning the one it supersedes
    pub fn insert(&mut self, class: ExtractedClass) -> Option<ExtractedClass> {
        self.classes.insert(class.class_id.clone(), class)
    }

    /// Remove a class
    pub fn remove(&mut self, class_id: &str) -> Option<ExtractedClass> {
        self.classes.remove(class_id)
    }

    /// Extraction of a class
    #[inline]
    #[must_use]
    pub fn get(&self, class_id: &str) -> Option<&ExtractedClass> {
        self.classes.get(class_id)
    }

    /// Check if a class is registered
    #[inline]
    #[must_use]
    pub fn contains(&self, class_id: &str) -> bool {
        self.classes.contains_key(class_id)
    }

    /// Iterate classes in id order
    pub fn iter(&self) -> impl Iterator<Item = &ExtractedClass> {
        self.classes.values()
    }

    /// Number of classes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Check if registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Join every class with its position
    ///
    /// Classes without stored metadata are placed at the origin.
    #[must_use]
    pub fn snapshot(&self, metadata: &MetadataStore) -> BTreeMap<ClassId, Class> {
        self.classes
            .iter()
            .map(|(id, extracted)| {
                let position = metadata.get(id).unwrap_or_default();
                (id.clone(), Class::new(extracted.clone(), position))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rapp_protocol::ClassMetadata;

    #[test]
    fn snapshot_joins_positions() {
        let mut registry = ClassRegistry::new();
        registry.insert(ExtractedClass::new("A"));
        registry.insert(ExtractedClass::new("B"));
        let mut metadata = MetadataStore::new("unused.json");
        metadata.set("A", ClassMetadata::new(5.0, 6.0));

        let snapshot = registry.snapshot(&metadata);
        assert_eq!(snapshot["A"].metadata(), ClassMetadata::new(5.0, 6.0));
        assert_eq!(snapshot["B"].metadata(), ClassMetadata::default());
    }

    #[test]
    fn insert_supersedes_wholesale() {
        let mut registry = ClassRegistry::new();
        assert!(registry.insert(ExtractedClass::new("A")).is_none());
        assert!(registry.insert(ExtractedClass::new("A")).is_some());
        assert_eq!(registry.len(), 1);
    }
}
