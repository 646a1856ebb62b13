//! Reconciliation of the local manifest with one remote scope

use serde::Serialize;
use serde_json::Value;
use serenity::all::GuildId;
use std::collections::HashSet;
use std::sync::Arc;
use switchyard_commands::ManifestEntry;
use tracing::{debug, error, info, warn};

use crate::diff::{normalize, SyncDiff};
use crate::error::{RemoteError, SyncError};
use crate::remote::RemoteRegistry;
use crate::scope::SyncScope;
use crate::snapshot::SnapshotStore;

/// Knobs of one [`Synchronizer::sync`] run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOptions {
    /// Push the whole manifest even when the snapshot matches
    pub force: bool,
    /// Empty the opposite scope afterwards
    pub clear_opposite: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncAction {
    /// Nothing was written to the remote scope
    Skipped,
    /// The remote scope was overwritten with the full manifest
    FullOverwrite,
    /// Only new and updated commands were pushed, removed ones deleted
    Targeted,
}

/// What a sync run did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub scope: SyncScope,
    pub action: SyncAction,
    pub diff: SyncDiff,
    /// Remote command count differed from the manifest length
    pub desynced: bool,
    pub pushed: usize,
    pub deleted: usize,
    pub snapshot_persisted: bool,
    pub opposite_cleared: Option<SyncScope>,
}

struct LocalCommand {
    id: String,
    payload: Value,
    normalized: Value,
}

/// Keeps a remote command scope in line with the manifest
pub struct Synchronizer {
    manifest: Vec<LocalCommand>,
    store: Arc<dyn SnapshotStore>,
    remote: Arc<dyn RemoteRegistry>,
    development_guild: Option<GuildId>,
}

impl Synchronizer {
    pub fn new(
        manifest: Vec<ManifestEntry>,
        store: Arc<dyn SnapshotStore>,
        remote: Arc<dyn RemoteRegistry>,
        development_guild: Option<GuildId>,
    ) -> Result<Self, SyncError> {
        let manifest = manifest
            .into_iter()
            .map(|entry| match entry.schema.to_value() {
                Ok(payload) => Ok(LocalCommand {
                    normalized: normalize(&payload),
                    payload,
                    id: entry.id,
                }),
                Err(source) => Err(SyncError::Encode { id: entry.id, source }),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            manifest,
            store,
            remote,
            development_guild,
        })
    }

    pub fn manifest_len(&self) -> usize {
        self.manifest.len()
    }

    pub fn development_guild(&self) -> Option<GuildId> {
        self.development_guild
    }

    /// Compare the manifest with the persisted snapshot of `scope`
    pub async fn check_synced(&self, scope: SyncScope) -> Result<SyncDiff, SyncError> {
        let persisted = self
            .store
            .list(scope)
            .await
            .map_err(|source| SyncError::Snapshot { scope, source })?;

        let local: Vec<(String, Value)> = self
            .manifest
            .iter()
            .map(|command| (command.id.clone(), command.normalized.clone()))
            .collect();

        let diff = SyncDiff::compute(&local, &persisted);
        debug!(
            "{}: {} new, {} updated, {} deleted",
            scope,
            diff.new.len(),
            diff.updated.len(),
            diff.deleted.len()
        );
        Ok(diff)
    }

    /// Bring the remote `scope` in line with the manifest.
    ///
    /// A failed remote write aborts before the snapshot is touched, so the
    /// next run starts from the same diff.
    pub async fn sync(&self, scope: SyncScope, options: SyncOptions) -> Result<SyncReport, SyncError> {
        let fetch = async {
            self.remote
                .fetch(scope)
                .await
                .map_err(|source| failed(SyncError::Fetch { scope, source }))
        };
        let (diff, remote) = tokio::try_join!(self.check_synced(scope), fetch)?;

        // Only detects count drift; equal-count content drift is left to the diff
        let desynced = remote.len() != self.manifest.len();
        if desynced {
            warn!(
                "{} holds {} commands but the manifest declares {}, overwriting",
                scope,
                remote.len(),
                self.manifest.len()
            );
        }

        let mut report = SyncReport {
            scope,
            action: SyncAction::Skipped,
            diff,
            desynced,
            pushed: 0,
            deleted: 0,
            snapshot_persisted: false,
            opposite_cleared: None,
        };

        if desynced || options.force {
            self.overwrite(&mut report).await?;
        } else if !report.diff.is_synced {
            self.push_changes(&mut report).await?;
        } else {
            info!("{} is in sync, skipping remote writes", scope);
        }

        if options.clear_opposite {
            report.opposite_cleared = self.clear_opposite(scope).await?;
        }

        Ok(report)
    }

    async fn overwrite(&self, report: &mut SyncReport) -> Result<(), SyncError> {
        let scope = report.scope;
        let payloads: Vec<Value> = self.manifest.iter().map(|c| c.payload.clone()).collect();

        self.remote
            .replace(scope, payloads)
            .await
            .map_err(|source| write_failed(scope, source))?;

        report.action = SyncAction::FullOverwrite;
        report.pushed = self.manifest.len();
        info!("Pushed all {} commands to {}", report.pushed, scope);

        report.snapshot_persisted = self.persist_full(scope).await;
        Ok(())
    }

    async fn push_changes(&self, report: &mut SyncReport) -> Result<(), SyncError> {
        let scope = report.scope;
        let wanted: HashSet<&String> = report.diff.to_push().collect();
        let changed: Vec<&LocalCommand> = self.manifest.iter().filter(|c| wanted.contains(&c.id)).collect();

        if !changed.is_empty() {
            let payloads = changed.iter().map(|c| c.payload.clone()).collect();
            self.remote
                .upsert(scope, payloads)
                .await
                .map_err(|source| write_failed(scope, source))?;
        }

        if !report.diff.deleted.is_empty() {
            self.remote
                .delete(scope, report.diff.deleted.clone())
                .await
                .map_err(|source| write_failed(scope, source))?;
        }

        report.action = SyncAction::Targeted;
        report.pushed = changed.len();
        report.deleted = report.diff.deleted.len();
        info!("Pushed {} and deleted {} commands in {}", report.pushed, report.deleted, scope);

        report.snapshot_persisted = self.persist_changes(scope, &changed, &report.diff.deleted).await;
        Ok(())
    }

    async fn persist_full(&self, scope: SyncScope) -> bool {
        if let Err(e) = self.store.clear(scope).await {
            warn!("Failed to reset snapshot of {}: {}", scope, e);
            return false;
        }
        let all: Vec<&LocalCommand> = self.manifest.iter().collect();
        self.persist_changes(scope, &all, &[]).await
    }

    async fn persist_changes(&self, scope: SyncScope, changed: &[&LocalCommand], deleted: &[String]) -> bool {
        for command in changed {
            if let Err(e) = self.store.upsert(scope, &command.id, &command.normalized).await {
                warn!("Failed to persist snapshot of {} in {}: {}", command.id, scope, e);
                return false;
            }
        }
        if !deleted.is_empty() {
            if let Err(e) = self.store.delete(scope, deleted).await {
                warn!("Failed to drop deleted snapshot rows of {}: {}", scope, e);
                return false;
            }
        }
        true
    }

    async fn clear_opposite(&self, scope: SyncScope) -> Result<Option<SyncScope>, SyncError> {
        let Some(opposite) = scope.opposite(self.development_guild) else {
            debug!("No opposite scope of {} to clear", scope);
            return Ok(None);
        };

        self.remote
            .replace(opposite, Vec::new())
            .await
            .map_err(|source| write_failed(opposite, source))?;

        if let Err(e) = self.store.clear(opposite).await {
            warn!("Failed to reset snapshot of {}: {}", opposite, e);
        }
        info!("Cleared commands of {}", opposite);
        Ok(Some(opposite))
    }
}

impl std::fmt::Debug for Synchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Synchronizer")
            .field("commands", &self.manifest.len())
            .field("development_guild", &self.development_guild)
            .finish_non_exhaustive()
    }
}

fn failed(err: SyncError) -> SyncError {
    error!("{}", err);
    err
}

fn write_failed(scope: SyncScope, source: RemoteError) -> SyncError {
    failed(SyncError::Write { scope, source })
}
