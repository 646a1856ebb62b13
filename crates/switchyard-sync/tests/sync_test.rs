//! Integration tests for manifest reconciliation.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use switchyard_commands::{CommandBuilder, CommandKind, CommandOption, CommandRegistry, Invocation, ManifestEntry};
use switchyard_common::test_utils::{create_temp_dir, init_test_logging};
use switchyard_sync::{
    remote_id, RemoteError, RemoteRegistry, SledSnapshotStore, SnapshotStore, SyncAction, SyncOptions, SyncScope,
    Synchronizer,
};

/// Remote registry keeping payloads in memory and counting writes
#[derive(Default)]
struct FakeRemote {
    scopes: Mutex<HashMap<SyncScope, Vec<Value>>>,
    writes: Mutex<Vec<&'static str>>,
}

impl FakeRemote {
    fn names(&self, scope: SyncScope) -> Vec<String> {
        let mut names: Vec<String> = self
            .scopes
            .lock()
            .get(&scope)
            .map(|schemas| schemas.iter().filter_map(remote_id).collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    fn writes(&self) -> Vec<&'static str> {
        self.writes.lock().clone()
    }
}

#[async_trait]
impl RemoteRegistry for FakeRemote {
    async fn fetch(&self, scope: SyncScope) -> Result<Vec<Value>, RemoteError> {
        Ok(self.scopes.lock().get(&scope).cloned().unwrap_or_default())
    }

    async fn replace(&self, scope: SyncScope, schemas: Vec<Value>) -> Result<(), RemoteError> {
        self.writes.lock().push("replace");
        self.scopes.lock().insert(scope, schemas);
        Ok(())
    }

    async fn upsert(&self, scope: SyncScope, schemas: Vec<Value>) -> Result<(), RemoteError> {
        self.writes.lock().push("upsert");
        let mut scopes = self.scopes.lock();
        let current = scopes.entry(scope).or_default();
        for schema in schemas {
            let id = remote_id(&schema);
            current.retain(|existing| remote_id(existing) != id);
            current.push(schema);
        }
        Ok(())
    }

    async fn delete(&self, scope: SyncScope, ids: Vec<String>) -> Result<(), RemoteError> {
        self.writes.lock().push("delete");
        if let Some(current) = self.scopes.lock().get_mut(&scope) {
            current.retain(|existing| remote_id(existing).map_or(true, |id| !ids.contains(&id)));
        }
        Ok(())
    }
}

async fn noop(_invocation: Invocation) -> anyhow::Result<()> {
    Ok(())
}

fn manifest(names: &[&str]) -> Vec<ManifestEntry> {
    let commands = names
        .iter()
        .map(|name| {
            CommandBuilder::new(CommandKind::ChatInput, *name)
                .description(format!("The {} command", name))
                .run(noop)
                .build()
                .unwrap()
        })
        .collect::<Vec<_>>();
    CommandRegistry::new(commands).unwrap().manifest()
}

#[tokio::test]
async fn test_first_sync_then_noop() {
    init_test_logging();
    let remote = Arc::new(FakeRemote::default());
    let dir = create_temp_dir();
    let store = Arc::new(SledSnapshotStore::open(dir.path().join("snapshots"), 8).unwrap());

    let sync = Synchronizer::new(manifest(&["a", "b"]), store.clone(), remote.clone(), None).unwrap();

    let first = sync.sync(SyncScope::Global, SyncOptions::default()).await.unwrap();
    assert_eq!(first.action, SyncAction::FullOverwrite);
    assert!(first.desynced);
    assert_eq!(remote.names(SyncScope::Global), vec!["ChatInput/a", "ChatInput/b"]);

    let second = sync.sync(SyncScope::Global, SyncOptions::default()).await.unwrap();
    assert_eq!(second.action, SyncAction::Skipped);
    assert_eq!(remote.writes(), vec!["replace"]);
}

#[tokio::test]
async fn test_manifest_change_is_pushed_selectively() {
    init_test_logging();
    let remote = Arc::new(FakeRemote::default());
    let dir = create_temp_dir();
    let store: Arc<dyn SnapshotStore> = Arc::new(SledSnapshotStore::open(dir.path().join("snapshots"), 8).unwrap());

    Synchronizer::new(manifest(&["a", "c"]), store.clone(), remote.clone(), None).unwrap()
        .sync(SyncScope::Global, SyncOptions::default())
        .await
        .unwrap();

    let sync = Synchronizer::new(manifest(&["a", "b"]), store.clone(), remote.clone(), None).unwrap();
    let diff = sync.check_synced(SyncScope::Global).await.unwrap();
    assert_eq!(diff.new, vec!["ChatInput/b"]);
    assert!(diff.updated.is_empty());
    assert_eq!(diff.deleted, vec!["ChatInput/c"]);

    let report = sync.sync(SyncScope::Global, SyncOptions::default()).await.unwrap();
    assert_eq!(report.action, SyncAction::Targeted);
    assert_eq!(remote.writes(), vec!["replace", "upsert", "delete"]);
    assert_eq!(remote.names(SyncScope::Global), vec!["ChatInput/a", "ChatInput/b"]);
    assert!(sync.check_synced(SyncScope::Global).await.unwrap().is_synced);
}

#[tokio::test]
async fn test_changed_option_is_an_update() {
    let remote = Arc::new(FakeRemote::default());
    let store: Arc<dyn SnapshotStore> = Arc::new(switchyard_sync::MemorySnapshotStore::new());

    Synchronizer::new(manifest(&["ping"]), store.clone(), remote.clone(), None).unwrap()
        .sync(SyncScope::Global, SyncOptions::default())
        .await
        .unwrap();

    let changed = CommandBuilder::new(CommandKind::ChatInput, "ping")
        .description("The ping command")
        .option(CommandOption::new(
            switchyard_commands::OptionType::Boolean,
            "ephemeral",
            "Only show the reply to you",
        ))
        .run(noop)
        .build()
        .unwrap();
    let manifest = CommandRegistry::new(vec![changed]).unwrap().manifest();

    let diff = Synchronizer::new(manifest, store, remote, None).unwrap()
        .check_synced(SyncScope::Global)
        .await
        .unwrap();
    assert_eq!(diff.updated, vec!["ChatInput/ping"]);
    assert!(diff.new.is_empty());
}

#[tokio::test]
async fn test_out_of_band_removal_triggers_overwrite() {
    let remote = Arc::new(FakeRemote::default());
    let store: Arc<dyn SnapshotStore> = Arc::new(switchyard_sync::MemorySnapshotStore::new());
    let sync = Synchronizer::new(manifest(&["a", "b"]), store, remote.clone(), None).unwrap();

    sync.sync(SyncScope::Global, SyncOptions::default()).await.unwrap();
    remote
        .delete(SyncScope::Global, vec!["ChatInput/b".to_string()])
        .await
        .unwrap();

    let report = sync.sync(SyncScope::Global, SyncOptions::default()).await.unwrap();
    assert!(report.diff.is_synced);
    assert!(report.desynced);
    assert_eq!(report.action, SyncAction::FullOverwrite);
    assert_eq!(remote.names(SyncScope::Global), vec!["ChatInput/a", "ChatInput/b"]);
}
