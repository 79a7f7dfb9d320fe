//! Project directory layout
//!
//! Where class sources, the entry file and the metadata file live, and which
//! files in the class directory count as classes.

use rapp_protocol::ClassId;
use rapp_source::{MutationOptions, SourceMutator, SourceWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default class directory relative to the project root
pub const DEFAULT_APP_DIR: &str = "src/app";

/// Default configuration directory relative to the project root
pub const DEFAULT_CONFIG_DIR: &str = ".reactive-app";

/// Default entry file name inside the class directory
pub const DEFAULT_ENTRY_FILE: &str = "index.ts";

/// Default class file extension
pub const DEFAULT_EXTENSION: &str = "ts";

/// Metadata file name inside the configuration directory
pub const METADATA_FILE: &str = "metadata.json";

/// Resolved paths of one project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    root: PathBuf,
    app_dir: PathBuf,
    config_dir: PathBuf,
    entry_file: String,
    extension: String,
}

impl ProjectLayout {
    /// Create layout with default directories under `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            app_dir: root.join(DEFAULT_APP_DIR),
            config_dir: root.join(DEFAULT_CONFIG_DIR),
            root,
            entry_file: DEFAULT_ENTRY_FILE.to_string(),
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }

    /// Set class directory relative to the root
    #[must_use]
    pub fn with_app_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.app_dir = self.root.join(dir);
        self
    }

    /// Set configuration directory relative to the root
    #[must_use]
    pub fn with_config_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.config_dir = self.root.join(dir);
        self
    }

    /// Set entry file name
    #[must_use]
    pub fn with_entry_file(mut self, name: impl Into<String>) -> Self {
        self.entry_file = name.into();
        self
    }

    /// Set class file extension, without the dot
    #[must_use]
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Project root
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Class directory
    #[inline]
    #[must_use]
    pub fn app_dir(&self) -> &Path {
        &self.app_dir
    }

    /// Configuration directory
    #[inline]
    #[must_use]
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Entry file name
    #[inline]
    #[must_use]
    pub fn entry_file(&self) -> &str {
        &self.entry_file
    }

    /// Class file extension
    #[inline]
    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Path of the metadata file
    #[must_use]
    pub fn metadata_path(&self) -> PathBuf {
        self.config_dir.join(METADATA_FILE)
    }

    /// Path of the file backing `class_id`
    #[must_use]
    pub fn class_path(&self, class_id: &str) -> PathBuf {
        self.app_dir.join(format!("{class_id}.{}", self.extension))
    }

    /// Class id of an eligible class file name
    ///
    /// The entry file, test files and hidden files are not classes.
    #[must_use]
    pub fn class_id_of(&self, file_name: &str) -> Option<ClassId> {
        if file_name == self.entry_file || file_name.starts_with('.') {
            return None;
        }
        let stem = file_name.strip_suffix(self.extension.as_str())?.strip_suffix('.')?;
        if stem.is_empty() || stem.ends_with(".test") || stem.ends_with(".spec") || stem.contains('.') {
            return None;
        }
        Some(stem.to_string())
    }

    /// Build the source mutator for this layout
    #[must_use]
    pub fn mutator(&self, options: MutationOptions, writer: Arc<SourceWriter>) -> SourceMutator {
        SourceMutator::new(
            self.app_dir.clone(),
            &self.entry_file,
            self.extension.clone(),
            options,
            writer,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_resolve_under_root() {
        let layout = ProjectLayout::new("/project");
        assert_eq!(layout.app_dir(), Path::new("/project/src/app"));
        assert_eq!(layout.metadata_path(), Path::new("/project/.reactive-app/metadata.json"));
        assert_eq!(layout.class_path("Counter"), Path::new("/project/src/app/Counter.ts"));
    }

    #[test]
    fn only_class_files_are_eligible() {
        let layout = ProjectLayout::new("/project");
        assert_eq!(layout.class_id_of("Counter.ts").as_deref(), Some("Counter"));
        assert_eq!(layout.class_id_of("index.ts"), None);
        assert_eq!(layout.class_id_of("Counter.test.ts"), None);
        assert_eq!(layout.class_id_of("Counter.spec.ts"), None);
        assert_eq!(layout.class_id_of(".Counter.ts.tmp"), None);
        assert_eq!(layout.class_id_of("Counter.tsx"), None);
        assert_eq!(layout.class_id_of("notes.md"), None);
    }
}
