//! Persisted class operations against a temporary project directory

use pretty_assertions::assert_eq;
use rapp_protocol::{Injector, InjectorKind, Mixin};
use rapp_source::mutate::registered_classes;
use rapp_source::{BasicFormatter, MutationOptions, SourceError, SourceFile, SourceMutator, SourceWriter};
use std::sync::Arc;
use tempfile::TempDir;

async fn project() -> (TempDir, SourceMutator) {
    let dir = tempfile::tempdir().unwrap();
    let writer = Arc::new(SourceWriter::new(Arc::new(BasicFormatter::default())));
    let mutator = SourceMutator::new(dir.path(), "index.ts", "ts", MutationOptions::default(), writer);
    assert!(mutator.ensure_entry().await.unwrap());
    (dir, mutator)
}

async fn registered(mutator: &SourceMutator) -> Vec<String> {
    let text = tokio::fs::read_to_string(mutator.entry_path()).await.unwrap();
    registered_classes(&SourceFile::parse(text).unwrap()).unwrap()
}

#[tokio::test]
async fn ensure_entry_is_idempotent() {
    let (_dir, mutator) = project().await;
    let before = tokio::fs::read_to_string(mutator.entry_path()).await.unwrap();
    assert!(!mutator.ensure_entry().await.unwrap());
    let after = tokio::fs::read_to_string(mutator.entry_path()).await.unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn create_class_writes_file_and_registers_it() {
    let (_dir, mutator) = project().await;
    mutator.create_class("Counter").await.unwrap();

    let text = tokio::fs::read_to_string(mutator.class_path("Counter")).await.unwrap();
    assert_eq!(text, "export class Counter {}\n");
    assert_eq!(registered(&mutator).await, vec!["Counter"]);

    let err = mutator.create_class("Counter").await.unwrap_err();
    assert!(matches!(err, SourceError::ClassExists(id) if id == "Counter"));
}

#[tokio::test]
async fn injector_add_and_remove_restores_the_source() {
    let (_dir, mutator) = project().await;
    mutator.create_class("Api").await.unwrap();
    mutator.create_class("Store").await.unwrap();
    let original = tokio::fs::read_to_string(mutator.class_path("Store")).await.unwrap();

    let extracted = mutator.add_injector("Api", "Store", InjectorKind::Inject).await.unwrap();
    assert_eq!(extracted.injectors, vec![Injector::new("Api", "api", InjectorKind::Inject)]);

    let extracted = mutator.remove_injector("Api", "Store").await.unwrap();
    assert!(extracted.injectors.is_empty());
    let restored = tokio::fs::read_to_string(mutator.class_path("Store")).await.unwrap();
    assert_eq!(restored, original);
}

#[tokio::test]
async fn replace_injector_switches_kind() {
    let (_dir, mutator) = project().await;
    mutator.create_class("Item").await.unwrap();
    mutator.create_class("List").await.unwrap();
    mutator.add_injector("Item", "List", InjectorKind::Inject).await.unwrap();

    let extracted = mutator
        .replace_injector("List", "Item", "item", InjectorKind::InjectFactory)
        .await
        .unwrap();
    assert_eq!(
        extracted.injectors,
        vec![Injector::new("Item", "createItem", InjectorKind::InjectFactory)]
    );
}

#[tokio::test]
async fn state_machine_toggles_off_cleanly() {
    let (_dir, mutator) = project().await;
    mutator.create_class("Door").await.unwrap();
    let original = tokio::fs::read_to_string(mutator.class_path("Door")).await.unwrap();

    let on = mutator.toggle_mixin("Door", Mixin::StateMachine).await.unwrap();
    assert!(on.mixins.contains(&Mixin::StateMachine));
    assert_eq!(on.observables.len(), 1);

    let off = mutator.toggle_mixin("Door", Mixin::StateMachine).await.unwrap();
    assert!(off.mixins.is_empty());
    assert!(off.observables.is_empty());
    let restored = tokio::fs::read_to_string(mutator.class_path("Door")).await.unwrap();
    assert_eq!(restored, original);
}

#[tokio::test]
async fn rename_moves_file_and_registration() {
    let (_dir, mutator) = project().await;
    mutator.create_class("Old").await.unwrap();
    mutator.toggle_mixin("Old", Mixin::Disposable).await.unwrap();

    let renamed = mutator.rename_class("Old", "New").await.unwrap();
    assert_eq!(renamed.class_id, "New");
    assert!(renamed.mixins.contains(&Mixin::Disposable));
    assert!(!mutator.class_path("Old").exists());
    assert!(mutator.class_path("New").exists());
    assert_eq!(registered(&mutator).await, vec!["New"]);
}

#[tokio::test]
async fn rename_onto_existing_class_fails() {
    let (_dir, mutator) = project().await;
    mutator.create_class("A").await.unwrap();
    mutator.create_class("B").await.unwrap();

    let err = mutator.rename_class("A", "B").await.unwrap_err();
    assert!(matches!(err, SourceError::ClassExists(_)));
    assert!(mutator.class_path("A").exists());
}

#[tokio::test]
async fn delete_then_unregister() {
    let (_dir, mutator) = project().await;
    mutator.create_class("Gone").await.unwrap();
    mutator.delete_class("Gone").await.unwrap();
    mutator.unregister_class("Gone").await.unwrap();

    assert!(!mutator.class_path("Gone").exists());
    assert!(registered(&mutator).await.is_empty());
    let err = mutator.extract_class("Gone").await.unwrap_err();
    assert!(matches!(err, SourceError::Io { .. }));
}
