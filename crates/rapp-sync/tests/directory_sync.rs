//! Synchronizer behavior against a temporary project directory

use pretty_assertions::assert_eq;
use rapp_protocol::{ClassMetadata, ExtractedClass, Injector, InjectorKind};
use rapp_source::mutate::registered_classes;
use rapp_source::{BasicFormatter, MutationOptions, SourceFile, SourceMutator, SourceWriter};
use rapp_sync::{DirectorySync, DirectoryWatcher, FileEvent, MetadataStore, ProjectLayout, SyncEvent};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;

fn project() -> (TempDir, ProjectLayout, SourceMutator) {
    let dir = tempfile::tempdir().unwrap();
    let layout = ProjectLayout::new(dir.path());
    let writer = Arc::new(SourceWriter::new(Arc::new(BasicFormatter::default())));
    let mutator = layout.mutator(MutationOptions::default(), writer);
    (dir, layout, mutator)
}

async fn registered(layout: &ProjectLayout) -> Vec<String> {
    let text = tokio::fs::read_to_string(layout.app_dir().join(layout.entry_file()))
        .await
        .unwrap();
    registered_classes(&SourceFile::parse(text).unwrap()).unwrap()
}

#[tokio::test]
async fn initial_load_skips_entry_and_test_files() {
    let (_dir, layout, mutator) = project();
    tokio::fs::create_dir_all(layout.app_dir()).await.unwrap();
    tokio::fs::write(layout.class_path("A"), "export class A {}\n").await.unwrap();
    tokio::fs::write(
        layout.class_path("B"),
        "import { inject } from \"reactive-app\";\nimport { A } from \"./A\";\n\nexport class B {\n  @inject(\"A\") a!: A;\n}\n",
    )
    .await
    .unwrap();
    tokio::fs::write(layout.app_dir().join("B.test.ts"), "describe(\"B\", () => {});\n")
        .await
        .unwrap();

    let (tx, _rx) = mpsc::unbounded_channel();
    let sync = DirectorySync::initialize(layout, mutator, tx).await.unwrap();

    let snapshot = sync.snapshot();
    assert_eq!(snapshot.keys().collect::<Vec<_>>(), vec!["A", "B"]);
    assert_eq!(
        snapshot["B"].extracted.injectors,
        vec![Injector::new("A", "a", InjectorKind::Inject)]
    );
}

#[tokio::test]
async fn corrupt_metadata_does_not_block_startup() {
    let (_dir, layout, mutator) = project();
    tokio::fs::create_dir_all(layout.config_dir()).await.unwrap();
    tokio::fs::write(layout.metadata_path(), "[1, 2").await.unwrap();

    let (tx, _rx) = mpsc::unbounded_channel();
    let sync = DirectorySync::initialize(layout, mutator, tx).await.unwrap();
    assert!(sync.metadata().is_empty());
}

#[tokio::test]
async fn removed_file_is_deleted_everywhere() {
    let (_dir, layout, mutator) = project();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut sync = DirectorySync::initialize(layout.clone(), mutator.clone(), tx).await.unwrap();

    mutator.create_class("Gone").await.unwrap();
    sync.handle_event(&FileEvent::rename("Gone.ts")).await.unwrap();
    sync.set_position("Gone", ClassMetadata::new(1.0, 2.0)).await.unwrap();
    assert_eq!(rx.recv().await, Some(SyncEvent::Created(ExtractedClass::new("Gone"))));
    assert_eq!(registered(&layout).await, vec!["Gone"]);

    tokio::fs::remove_file(layout.class_path("Gone")).await.unwrap();
    sync.handle_event(&FileEvent::rename("Gone.ts")).await.unwrap();

    assert_eq!(rx.recv().await, Some(SyncEvent::Deleted("Gone".into())));
    assert!(!sync.registry().contains("Gone"));
    assert!(registered(&layout).await.is_empty());
    let persisted = MetadataStore::load(layout.metadata_path()).await.unwrap();
    assert_eq!(persisted.get("Gone"), None);

    sync.handle_event(&FileEvent::rename("Gone.ts")).await.unwrap();
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn stale_registration_is_dropped_when_its_file_goes() {
    let (_dir, layout, mutator) = project();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut sync = DirectorySync::initialize(layout.clone(), mutator.clone(), tx).await.unwrap();

    // Registered by hand while its file never made it into the registry
    mutator.register_class("Stale").await.unwrap();
    assert_eq!(registered(&layout).await, vec!["Stale"]);
    assert!(!sync.registry().contains("Stale"));

    sync.handle_event(&FileEvent::rename("Stale.ts")).await.unwrap();

    assert!(registered(&layout).await.is_empty());
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn handle_requests_are_served_in_order() {
    let (_dir, layout, mutator) = project();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let sync = DirectorySync::initialize(layout, mutator.clone(), tx).await.unwrap();
    let (_file_tx, file_rx) = mpsc::unbounded_channel();
    let (handle, _task) = sync.spawn(file_rx);

    handle.set_position("Old", ClassMetadata::new(7.0, 8.0)).await.unwrap();
    mutator.create_class("Old").await.unwrap();
    handle.reconcile("Old").await.unwrap();
    assert_eq!(rx.recv().await, Some(SyncEvent::Created(ExtractedClass::new("Old"))));

    let moved = handle.rename_position("Old", "New").await.unwrap();
    assert_eq!(moved, Some(ClassMetadata::new(7.0, 8.0)));
    mutator.rename_class("Old", "New").await.unwrap();
    handle.reconcile("Old").await.unwrap();
    handle.reconcile("New").await.unwrap();

    assert_eq!(rx.recv().await, Some(SyncEvent::Deleted("Old".into())));
    assert_eq!(rx.recv().await, Some(SyncEvent::Created(ExtractedClass::new("New"))));
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot["New"].metadata(), ClassMetadata::new(7.0, 8.0));
    assert!(!snapshot.contains_key("Old"));
}

#[tokio::test]
async fn watcher_reports_external_edits() {
    let (_dir, layout, mutator) = project();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let sync = DirectorySync::initialize(layout.clone(), mutator, tx).await.unwrap();
    let (_watcher, file_rx) = DirectoryWatcher::start(layout.app_dir()).unwrap();
    let (_handle, _task) = sync.spawn(file_rx);

    tokio::fs::write(layout.class_path("Fresh"), "export class Fresh {}\n")
        .await
        .unwrap();

    let created = tokio::time::timeout(Duration::from_secs(10), async {
        while let Some(event) = rx.recv().await {
            if let SyncEvent::Created(class) = event {
                return class;
            }
        }
        panic!("synchronizer stopped");
    })
    .await
    .unwrap();
    assert_eq!(created, ExtractedClass::new("Fresh"));
}
