//! Editor configuration
//!
//! Defaults can be overridden by an optional `reactive-app.toml` in the
//! project root, then by command-line flags.

use crate::error::{EditorError, EditorResult};
use rapp_source::{FormatOptions, MutationOptions};
use rapp_sync::layout::{DEFAULT_APP_DIR, DEFAULT_CONFIG_DIR, DEFAULT_ENTRY_FILE, DEFAULT_EXTENSION};
use rapp_sync::ProjectLayout;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Editor backend configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Project root; never read from the config file
    #[serde(skip)]
    pub root: PathBuf,
    /// Class directory relative to the root
    pub app_dir: PathBuf,
    /// Configuration directory relative to the root
    pub config_dir: PathBuf,
    /// Entry file name inside the class directory
    pub entry_file: String,
    /// Class file extension
    pub extension: String,
    /// Module exporting the container and decorators
    pub library_import: String,
    /// Module exporting the mixins
    pub mixins_import: String,
    /// Interface the listeners bind to
    pub host: String,
    /// Editor WebSocket port
    pub port: u16,
    /// Devtool port instrumented programs report to
    pub devtool_port: u16,
    /// Program run with the class file path on `class-open`
    pub open_command: Option<String>,
    /// Watch the class directory for external edits
    pub watch: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            app_dir: PathBuf::from(DEFAULT_APP_DIR),
            config_dir: PathBuf::from(DEFAULT_CONFIG_DIR),
            entry_file: DEFAULT_ENTRY_FILE.to_string(),
            extension: DEFAULT_EXTENSION.to_string(),
            library_import: "reactive-app".to_string(),
            mixins_import: "reactive-app/mixins".to_string(),
            host: "127.0.0.1".to_string(),
            port: 5050,
            devtool_port: 5051,
            open_command: None,
            watch: true,
        }
    }
}

impl EditorConfig {
    /// Name of the optional project config file
    pub const FILE_NAME: &'static str = "reactive-app.toml";

    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the project config under `root`
    ///
    /// A missing file yields the defaults; an invalid one is logged and
    /// also yields the defaults.
    pub async fn load(root: &Path) -> Self {
        let path = root.join(Self::FILE_NAME);
        let config = match tokio::fs::read_to_string(&path).await {
            Ok(text) => Self::parse(&path, &text).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "ignoring invalid editor config");
                Self::default()
            }),
            Err(_) => Self::default(),
        };
        config.with_root(root)
    }

    /// Parse the TOML form
    ///
    /// # Errors
    /// Returns [`EditorError::Config`] if the text is not a valid config
    pub fn parse(path: &Path, text: &str) -> EditorResult<Self> {
        toml::from_str(text).map_err(|source| EditorError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// With project root
    #[inline]
    #[must_use]
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// With editor port
    #[inline]
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// With devtool port
    #[inline]
    #[must_use]
    pub fn with_devtool_port(mut self, port: u16) -> Self {
        self.devtool_port = port;
        self
    }

    /// With open command
    #[inline]
    #[must_use]
    pub fn with_open_command(mut self, command: impl Into<String>) -> Self {
        self.open_command = Some(command.into());
        self
    }

    /// With directory watching on or off
    #[inline]
    #[must_use]
    pub fn with_watch(mut self, watch: bool) -> Self {
        self.watch = watch;
        self
    }

    /// Resolved project paths
    #[must_use]
    pub fn layout(&self) -> ProjectLayout {
        ProjectLayout::new(&self.root)
            .with_app_dir(&self.app_dir)
            .with_config_dir(&self.config_dir)
            .with_entry_file(&self.entry_file)
            .with_extension(&self.extension)
    }

    /// Address written into a fresh entry file
    #[must_use]
    pub fn devtool_address(&self) -> String {
        format!("localhost:{}", self.devtool_port)
    }

    /// Rewrite options for the project
    #[must_use]
    pub fn mutation_options(&self, format: FormatOptions) -> MutationOptions {
        MutationOptions {
            library_import: self.library_import.clone(),
            mixins_import: self.mixins_import.clone(),
            devtool_address: self.devtool_address(),
            format,
        }
    }

    /// Bind address of the editor endpoint
    #[must_use]
    pub fn editor_bind(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Bind address of the devtool endpoint
    #[must_use]
    pub fn devtool_bind(&self) -> String {
        format!("{}:{}", self.host, self.devtool_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = EditorConfig::parse(
            Path::new("reactive-app.toml"),
            "port = 7000\nopen_command = \"code\"\napp_dir = \"lib/classes\"\n",
        )
        .unwrap();
        assert_eq!(config.port, 7000);
        assert_eq!(config.open_command.as_deref(), Some("code"));
        assert_eq!(config.devtool_port, 5051);
        assert_eq!(config.entry_file, "index.ts");

        let layout = config.with_root("/project").layout();
        assert_eq!(layout.app_dir(), Path::new("/project/lib/classes"));
    }

    #[test]
    fn invalid_file_is_a_config_error() {
        let err = EditorConfig::parse(Path::new("reactive-app.toml"), "port = \"high\"").unwrap_err();
        assert!(matches!(err, EditorError::Config { .. }));
    }

    #[tokio::test]
    async fn load_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(EditorConfig::FILE_NAME), "port = [").unwrap();
        let config = EditorConfig::load(dir.path()).await;
        assert_eq!(config, EditorConfig::default().with_root(dir.path()));
    }

    #[test]
    fn options_carry_devtool_address() {
        let options = EditorConfig::new()
            .with_devtool_port(6000)
            .mutation_options(FormatOptions::default());
        assert_eq!(options.devtool_address, "localhost:6000");
    }
}
