//! Persisted class positions
//!
//! One JSON object `{classId: {x, y}}`. Entries keep insertion order so the
//! file diffs stay small.

use crate::error::{SyncError, SyncResult};
use indexmap::IndexMap;
use rapp_protocol::{ClassId, ClassMetadata};
use std::path::{Path, PathBuf};

/// In-memory copy of the metadata file
#[derive(Debug, Clone)]
pub struct MetadataStore {
    path: PathBuf,
    entries: IndexMap<ClassId, ClassMetadata>,
}

impl MetadataStore {
    /// Create empty store backed by `path`
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: IndexMap::new(),
        }
    }

    /// Load the metadata file
    ///
    /// A missing file is created empty. A corrupt file is logged and
    /// replaced by an empty store.
    ///
    /// # Errors
    /// Returns [`SyncError::Io`] if the file cannot be read or created
    pub async fn load(path: impl Into<PathBuf>) -> SyncResult<Self> {
        let mut store = Self::new(path);
        match tokio::fs::read_to_string(&store.path).await {
            Ok(text) => match Self::parse(&store.path, &text) {
                Ok(entries) => store.entries = entries,
                Err(e) => tracing::warn!(error = %e, "starting with empty metadata"),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                store.save().await?;
                tracing::info!(path = %store.path.display(), "created metadata file");
            }
            Err(e) => return Err(SyncError::io_error(&store.path, e)),
        }
        Ok(store)
    }

    fn parse(path: &Path, text: &str) -> SyncResult<IndexMap<ClassId, ClassMetadata>> {
        serde_json::from_str(text).map_err(|source| SyncError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write the store as pretty JSON
    ///
    /// # Errors
    /// Returns serialization or IO errors
    pub async fn save(&self) -> SyncResult<()> {
        let mut text = serde_json::to_string_pretty(&self.entries).map_err(SyncError::Serialize)?;
        text.push('\n');
        rapp_source::write_atomic(&self.path, &text).await?;
        Ok(())
    }

    /// Backing file
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Position of a class
    #[inline]
    #[must_use]
    pub fn get(&self, class_id: &str) -> Option<ClassMetadata> {
        self.entries.get(class_id).copied()
    }

    /// Set the position of a class
    pub fn set(&mut self, class_id: impl Into<ClassId>, metadata: ClassMetadata) {
        self.entries.insert(class_id.into(), metadata);
    }

    /// Forget a class, keeping the order of the others
    pub fn remove(&mut self, class_id: &str) -> Option<ClassMetadata> {
        self.entries.shift_remove(class_id)
    }

    /// Move the entry of `from` to `to`, keeping its slot
    pub fn rename(&mut self, from: &str, to: impl Into<ClassId>) -> Option<ClassMetadata> {
        let index = self.entries.get_index_of(from)?;
        let (_, metadata) = self.entries.shift_remove_index(index)?;
        let (last, _) = self.entries.insert_full(to.into(), metadata);
        self.entries.move_index(last, index.min(last));
        Some(metadata)
    }

    /// Number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if store is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn missing_file_is_created_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata.json");
        let store = MetadataStore::load(&path).await.unwrap();

        assert!(store.is_empty());
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "{}\n");
    }

    #[tokio::test]
    async fn corrupt_file_falls_back_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata.json");
        tokio::fs::write(&path, "{ not json").await.unwrap();

        let store = MetadataStore::load(&path).await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn saved_entries_load_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata.json");
        let mut store = MetadataStore::new(&path);
        store.set("B", ClassMetadata::new(10.0, 20.0));
        store.set("A", ClassMetadata::new(1.5, 2.5));
        store.save().await.unwrap();

        let text = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(text.starts_with("{\n  \"B\": {\n    \"x\": 10.0,"));

        let loaded = MetadataStore::load(&path).await.unwrap();
        assert_eq!(loaded.get("A"), Some(ClassMetadata::new(1.5, 2.5)));
        assert_eq!(loaded.len(), 2);
    }

    #[test]
    fn rename_keeps_slot() {
        let mut store = MetadataStore::new("unused.json");
        store.set("A", ClassMetadata::new(1.0, 1.0));
        store.set("B", ClassMetadata::new(2.0, 2.0));
        store.set("C", ClassMetadata::new(3.0, 3.0));

        assert_eq!(store.rename("B", "Renamed"), Some(ClassMetadata::new(2.0, 2.0)));
        let keys: Vec<_> = store.entries.keys().cloned().collect();
        assert_eq!(keys, vec!["A", "Renamed", "C"]);
        assert_eq!(store.rename("Missing", "X"), None);
    }
}
