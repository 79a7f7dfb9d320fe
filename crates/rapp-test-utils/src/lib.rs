//! Testing utilities for the Reactive App workspace
//!
//! Temporary project directories and sample class sources.

#![allow(missing_docs)]

use rapp_protocol::{ClassId, ClassMetadata};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const LIBRARY: &str = "reactive-app";
pub const APP_DIR: &str = "src/app";
pub const ENTRY_FILE: &str = "index.ts";

/// Project directory removed on drop
#[derive(Debug)]
pub struct TempProject {
    dir: TempDir,
}

impl TempProject {
    /// Empty project with an existing class directory
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(APP_DIR)).unwrap();
        Self { dir }
    }

    /// Write a `package.json` listing `dependencies`
    pub fn with_package_json(self, dependencies: &[&str]) -> Self {
        let dependencies: serde_json::Map<String, Value> = dependencies
            .iter()
            .map(|name| ((*name).to_string(), json!("*")))
            .collect();
        let package = json!({ "name": "sample", "dependencies": dependencies });
        std::fs::write(self.root().join("package.json"), package.to_string()).unwrap();
        self
    }

    /// Project ready for the editor
    pub fn ready() -> Self {
        Self::new().with_package_json(&[LIBRARY])
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn app_dir(&self) -> PathBuf {
        self.root().join(APP_DIR)
    }

    pub fn class_path(&self, class_id: &str) -> PathBuf {
        self.app_dir().join(format!("{class_id}.ts"))
    }

    pub fn entry_path(&self) -> PathBuf {
        self.app_dir().join(ENTRY_FILE)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.root().join(".reactive-app").join("metadata.json")
    }

    pub fn write_class(&self, class_id: &str, source: &str) {
        std::fs::write(self.class_path(class_id), source).unwrap();
    }

    pub fn read_class(&self, class_id: &str) -> String {
        std::fs::read_to_string(self.class_path(class_id)).unwrap()
    }

    pub fn has_class(&self, class_id: &str) -> bool {
        self.class_path(class_id).exists()
    }

    pub fn entry(&self) -> String {
        std::fs::read_to_string(self.entry_path()).unwrap()
    }

    /// Stored position of `class_id`, if any
    pub fn position(&self, class_id: &str) -> Option<ClassMetadata> {
        let text = std::fs::read_to_string(self.metadata_path()).ok()?;
        let metadata: Value = serde_json::from_str(&text).ok()?;
        serde_json::from_value(metadata.get(class_id)?.clone()).ok()
    }
}

impl Default for TempProject {
    fn default() -> Self {
        Self::new()
    }
}

/// Source of a class without members
pub fn empty_class(class_id: &str) -> String {
    format!("export class {class_id} {{}}\n")
}

/// Source of `owner` injecting each of `sources` as a singleton
pub fn injecting_class(owner: &str, sources: &[&str]) -> String {
    let mut text = format!("import {{ inject }} from \"{LIBRARY}\";\n");
    for source in sources {
        text.push_str(&format!("import {{ {source} }} from \"./{source}\";\n"));
    }
    text.push_str(&format!("\nexport class {owner} {{\n"));
    for source in sources {
        let mut chars = source.chars();
        let property: String = chars
            .next()
            .map(|first| first.to_lowercase().chain(chars).collect())
            .unwrap_or_default();
        text.push_str(&format!("  @inject(\"{source}\") {property}!: {source};\n"));
    }
    text.push_str("}\n");
    text
}

/// Source of a class with one member of every reactive category
pub fn counter_class(class_id: &str) -> String {
    format!(
        "import {{ action, computed, observable }} from \"{LIBRARY}\";\n\n\
         export class {class_id} {{\n\
         \x20 @observable count = 0;\n\
         \x20 @computed get double() {{\n\
         \x20   return this.count * 2;\n\
         \x20 }}\n\
         \x20 @action increment() {{\n\
         \x20   this.count++;\n\
         \x20 }}\n\
         }}\n"
    )
}

/// Class ids in `ids`, owned
pub fn class_ids(ids: &[&str]) -> Vec<ClassId> {
    ids.iter().map(ToString::to_string).collect()
}
