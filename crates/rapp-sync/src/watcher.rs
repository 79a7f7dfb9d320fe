//! Class directory watcher
//!
//! Raw notify events are reduced to two kinds: content changes and
//! appear/disappear events ("rename"). Whether a rename is a create or a
//! delete is decided later by checking the disk.

use crate::error::SyncResult;
use notify::event::ModifyKind;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use tokio::sync::mpsc;

/// Kind of a filesystem event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileEventKind {
    /// File contents changed
    Change,
    /// File appeared, disappeared or was moved
    Rename,
}

/// Filesystem event on one file of the class directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
    /// Event kind
    pub kind: FileEventKind,
    /// File name inside the class directory
    pub file_name: String,
}

impl FileEvent {
    /// Create change event
    #[must_use]
    pub fn change(file_name: impl Into<String>) -> Self {
        Self {
            kind: FileEventKind::Change,
            file_name: file_name.into(),
        }
    }

    /// Create rename event
    #[must_use]
    pub fn rename(file_name: impl Into<String>) -> Self {
        Self {
            kind: FileEventKind::Rename,
            file_name: file_name.into(),
        }
    }
}

/// Reduce a notify event to file events
#[must_use]
pub fn classify(event: &notify::Event) -> Vec<FileEvent> {
    let kind = match event.kind {
        EventKind::Create(_) | EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(_)) => {
            FileEventKind::Rename
        }
        EventKind::Modify(_) => FileEventKind::Change,
        EventKind::Access(_) | EventKind::Any | EventKind::Other => return Vec::new(),
    };
    event
        .paths
        .iter()
        .filter_map(|path| path.file_name()?.to_str())
        .map(|file_name| FileEvent {
            kind,
            file_name: file_name.to_string(),
        })
        .collect()
}

/// Active watch on the class directory
///
/// Watching stops when this is dropped.
#[derive(Debug)]
pub struct DirectoryWatcher {
    _watcher: RecommendedWatcher,
}

impl DirectoryWatcher {
    /// Watch `dir` non-recursively, queueing classified events
    ///
    /// # Errors
    /// Returns [`crate::SyncError::Watch`] if the watch cannot be installed
    pub fn start(dir: &Path) -> SyncResult<(Self, mpsc::UnboundedReceiver<FileEvent>)> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |result: notify::Result<notify::Event>| match result {
            Ok(event) => {
                for file_event in classify(&event) {
                    if tx.send(file_event).is_err() {
                        return;
                    }
                }
            }
            Err(e) => tracing::warn!(error = %e, "watch error"),
        })?;
        watcher.watch(dir, RecursiveMode::NonRecursive)?;
        tracing::info!(dir = %dir.display(), "watching class directory");
        Ok((Self { _watcher: watcher }, rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, RemoveKind, RenameMode};
    use std::path::PathBuf;

    fn event(kind: EventKind, paths: &[&str]) -> notify::Event {
        let mut event = notify::Event::new(kind);
        for path in paths {
            event = event.add_path(PathBuf::from(path));
        }
        event
    }

    #[test]
    fn content_writes_are_changes() {
        let events = classify(&event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            &["/app/A.ts"],
        ));
        assert_eq!(events, vec![FileEvent::change("A.ts")]);
    }

    #[test]
    fn creates_removes_and_moves_are_renames() {
        assert_eq!(
            classify(&event(EventKind::Create(CreateKind::File), &["/app/A.ts"])),
            vec![FileEvent::rename("A.ts")]
        );
        assert_eq!(
            classify(&event(EventKind::Remove(RemoveKind::File), &["/app/A.ts"])),
            vec![FileEvent::rename("A.ts")]
        );
        assert_eq!(
            classify(&event(
                EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
                &["/app/.A.ts.tmp", "/app/A.ts"]
            )),
            vec![FileEvent::rename(".A.ts.tmp"), FileEvent::rename("A.ts")]
        );
    }

    #[test]
    fn access_is_ignored() {
        let access = EventKind::Access(notify::event::AccessKind::Any);
        assert!(classify(&event(access, &["/app/A.ts"])).is_empty());
    }
}
