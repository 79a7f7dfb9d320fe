//! Serialized, formatted, atomic file writes
//!
//! Every read-modify-write of one path holds that path's lock for its whole
//! duration, so two edits of the same class never interleave. Writes go to a
//! temporary sibling first and are renamed into place.

use crate::error::{SourceError, SourceResult};
use crate::format::{FileKind, Formatter};
use crate::syntax::SourceFile;
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Per-path serialized writer
pub struct SourceWriter {
    formatter: Arc<dyn Formatter>,
    locks: DashMap<PathBuf, Arc<Mutex<()>>>,
}

impl std::fmt::Debug for SourceWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceWriter")
            .field("locked_paths", &self.locks.len())
            .finish_non_exhaustive()
    }
}

impl SourceWriter {
    /// Create writer using `formatter` before every write
    #[must_use]
    pub fn new(formatter: Arc<dyn Formatter>) -> Self {
        Self {
            formatter,
            locks: DashMap::new(),
        }
    }

    /// Acquire the lock of `path`
    pub async fn lock(&self, path: &Path) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Read and parse a source file without locking
    ///
    /// # Errors
    /// Returns [`SourceError::Io`] if the file cannot be read
    pub async fn read(&self, path: &Path) -> SourceResult<SourceFile> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SourceError::io_error(path, e))?;
        SourceFile::parse(text)
    }

    /// Read, transform, format and write back one file
    ///
    /// The file is only written when the formatted result differs.
    ///
    /// # Errors
    /// Propagates read, transform, format and write failures; on error the
    /// file on disk is unchanged
    pub async fn modify<F>(&self, path: &Path, kind: FileKind, transform: F) -> SourceResult<SourceFile>
    where
        F: FnOnce(SourceFile) -> SourceResult<SourceFile>,
    {
        let _guard = self.lock(path).await;
        let original = self.read(path).await?;
        let original_text = original.text().to_string();

        let updated = transform(original)?;
        let formatted = self.formatter.format(updated.text(), kind)?;
        if formatted != original_text {
            write_atomic(path, &formatted).await?;
            tracing::debug!(path = %path.display(), "rewrote source");
        }
        SourceFile::parse(formatted)
    }

    /// Format and write a whole file
    ///
    /// # Errors
    /// Propagates format and write failures
    pub async fn write(&self, path: &Path, kind: FileKind, text: &str) -> SourceResult<()> {
        let _guard = self.lock(path).await;
        let formatted = self.formatter.format(text, kind)?;
        write_atomic(path, &formatted).await
    }

    /// Delete a file
    ///
    /// The lock of `path` is forgotten only when nobody else is waiting on it.
    ///
    /// # Errors
    /// Returns [`SourceError::Io`] if the file cannot be removed
    pub async fn remove(&self, path: &Path) -> SourceResult<()> {
        let guard = self.lock(path).await;
        tokio::fs::remove_file(path)
            .await
            .map_err(|e| SourceError::io_error(path, e))?;
        // One reference in the map, one in our guard
        self.locks.remove_if(path, |_, lock| Arc::strong_count(lock) == 2);
        drop(guard);
        Ok(())
    }
}

/// Write through a temporary sibling and rename into place
///
/// # Errors
/// Returns [`SourceError::Io`] if either step fails
pub async fn write_atomic(path: &Path, contents: &str) -> SourceResult<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp = path.with_file_name(format!(".{file_name}.tmp"));

    tokio::fs::write(&temp, contents)
        .await
        .map_err(|e| SourceError::io_error(&temp, e))?;
    tokio::fs::rename(&temp, path)
        .await
        .map_err(|e| SourceError::io_error(path, e))
}
