//! One persisted operation per editor command
//!
//! [`SourceMutator`] binds the pure rewrites of [`crate::mutate`] to the
//! class directory and entry file of one project.

use crate::error::{SourceError, SourceResult};
use crate::extract::extract_file;
use crate::format::FileKind;
use crate::mutate::{self, MutationOptions};
use crate::writer::SourceWriter;
use rapp_protocol::{ExtractedClass, InjectorKind, Mixin};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Applies structural edits to the class files of a project
#[derive(Debug, Clone)]
pub struct SourceMutator {
    app_dir: PathBuf,
    entry_path: PathBuf,
    extension: String,
    options: MutationOptions,
    writer: Arc<SourceWriter>,
}

impl SourceMutator {
    /// Create mutator for a class directory
    #[must_use]
    pub fn new(
        app_dir: impl Into<PathBuf>,
        entry_file: &str,
        extension: impl Into<String>,
        options: MutationOptions,
        writer: Arc<SourceWriter>,
    ) -> Self {
        let app_dir = app_dir.into();
        Self {
            entry_path: app_dir.join(entry_file),
            app_dir,
            extension: extension.into(),
            options,
            writer,
        }
    }

    /// Directory holding class files
    #[inline]
    #[must_use]
    pub fn app_dir(&self) -> &Path {
        &self.app_dir
    }

    /// Entry file holding the registration literal
    #[inline]
    #[must_use]
    pub fn entry_path(&self) -> &Path {
        &self.entry_path
    }

    /// Code generation options
    #[inline]
    #[must_use]
    pub fn options(&self) -> &MutationOptions {
        &self.options
    }

    /// Path of the file backing `class_id`
    #[must_use]
    pub fn class_path(&self, class_id: &str) -> PathBuf {
        self.app_dir.join(format!("{class_id}.{}", self.extension))
    }

    /// Read and extract one class
    ///
    /// # Errors
    /// Returns IO or [`SourceError::ClassNotFound`] errors
    pub async fn extract_class(&self, class_id: &str) -> SourceResult<ExtractedClass> {
        let file = self.writer.read(&self.class_path(class_id)).await?;
        extract_file(&file, class_id)
    }

    /// Create the entry file with an empty registration if it is missing
    ///
    /// Returns whether the file was created.
    ///
    /// # Errors
    /// Returns [`SourceError::Io`] if the file cannot be written
    pub async fn ensure_entry(&self) -> SourceResult<bool> {
        if tokio::fs::try_exists(&self.entry_path).await.unwrap_or(false) {
            return Ok(false);
        }
        self.writer
            .write(&self.entry_path, FileKind::TypeScript, &mutate::entry_template(&self.options))
            .await?;
        tracing::info!(path = %self.entry_path.display(), "created entry file");
        Ok(true)
    }

    /// Write a new class file and register it in the entry file
    ///
    /// # Errors
    /// Returns [`SourceError::ClassExists`] if the file is already present
    pub async fn create_class(&self, class_id: &str) -> SourceResult<()> {
        let path = self.class_path(class_id);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(SourceError::ClassExists(class_id.to_string()));
        }
        self.writer
            .write(&path, FileKind::TypeScript, &mutate::class_template(class_id))
            .await?;
        self.register_class(class_id).await?;
        tracing::info!(class_id = %class_id, "created class");
        Ok(())
    }

    /// Remove the file backing `class_id`
    ///
    /// Registration and referencing injectors are cleaned up by the caller.
    ///
    /// # Errors
    /// Returns [`SourceError::Io`] if the file cannot be removed
    pub async fn delete_class(&self, class_id: &str) -> SourceResult<()> {
        self.writer.remove(&self.class_path(class_id)).await?;
        tracing::info!(class_id = %class_id, "deleted class");
        Ok(())
    }

    /// Inject `from` into `to`
    ///
    /// # Errors
    /// Propagates rewrite and IO errors
    pub async fn add_injector(&self, from: &str, to: &str, kind: InjectorKind) -> SourceResult<ExtractedClass> {
        self.modify_class(to, |file| mutate::add_injector(file, &self.options, to, from, kind))
            .await
    }

    /// Rewrite the injector property `property_name` of `class_id`
    ///
    /// # Errors
    /// Propagates rewrite and IO errors
    pub async fn replace_injector(
        &self,
        class_id: &str,
        inject_class_id: &str,
        property_name: &str,
        kind: InjectorKind,
    ) -> SourceResult<ExtractedClass> {
        self.modify_class(class_id, |file| {
            mutate::replace_injector(file, &self.options, class_id, property_name, inject_class_id, kind)
        })
        .await
    }

    /// Remove the injectors of `from` from `to`
    ///
    /// # Errors
    /// Propagates rewrite and IO errors
    pub async fn remove_injector(&self, from: &str, to: &str) -> SourceResult<ExtractedClass> {
        self.modify_class(to, |file| mutate::remove_injector(file, &self.options, to, from))
            .await
    }

    /// Toggle a mixin on `class_id`
    ///
    /// # Errors
    /// Propagates rewrite and IO errors
    pub async fn toggle_mixin(&self, class_id: &str, mixin: Mixin) -> SourceResult<ExtractedClass> {
        self.modify_class(class_id, |file| mutate::toggle_mixin(file, &self.options, class_id, mixin))
            .await
    }

    /// Add `class_id` to the registration literal
    ///
    /// # Errors
    /// Returns [`SourceError::RegistrationNotFound`] or IO errors
    pub async fn register_class(&self, class_id: &str) -> SourceResult<()> {
        self.writer
            .modify(&self.entry_path, FileKind::TypeScript, |file| {
                mutate::register_class(file, &self.options, class_id)
            })
            .await?;
        Ok(())
    }

    /// Remove `class_id` from the registration literal
    ///
    /// # Errors
    /// Returns [`SourceError::RegistrationNotFound`] or IO errors
    pub async fn unregister_class(&self, class_id: &str) -> SourceResult<()> {
        self.writer
            .modify(&self.entry_path, FileKind::TypeScript, |file| {
                mutate::unregister_class(file, class_id)
            })
            .await?;
        Ok(())
    }

    /// Rename the declaration and file of `from` and its registration
    ///
    /// Injectors in other classes are re-pointed by the caller.
    ///
    /// # Errors
    /// Returns [`SourceError::ClassExists`] if `to` already has a file
    pub async fn rename_class(&self, from: &str, to: &str) -> SourceResult<ExtractedClass> {
        let old_path = self.class_path(from);
        let new_path = self.class_path(to);
        if tokio::fs::try_exists(&new_path).await.unwrap_or(false) {
            return Err(SourceError::ClassExists(to.to_string()));
        }

        let renamed = {
            let _guard = self.writer.lock(&old_path).await;
            let file = self.writer.read(&old_path).await?;
            mutate::rename_class(file, from, to)?
        };
        self.writer
            .write(&new_path, FileKind::TypeScript, renamed.text())
            .await?;
        self.writer.remove(&old_path).await?;

        self.unregister_class(from).await?;
        self.register_class(to).await?;
        tracing::info!(from = %from, to = %to, "renamed class");
        extract_file(&renamed, to)
    }

    async fn modify_class<F>(&self, class_id: &str, transform: F) -> SourceResult<ExtractedClass>
    where
        F: FnOnce(crate::SourceFile) -> SourceResult<crate::SourceFile>,
    {
        let file = self
            .writer
            .modify(&self.class_path(class_id), FileKind::TypeScript, transform)
            .await?;
        extract_file(&file, class_id)
    }
}
