//! The platform's command registry

use async_trait::async_trait;
use serde_json::Value;
use serenity::all::{ApplicationId, Command, CommandId};
use serenity::http::Http;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::diff::remote_id;
use crate::error::RemoteError;
use crate::scope::SyncScope;

/// Remote command catalog of one application
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteRegistry: Send + Sync {
    /// Current payloads of `scope`
    async fn fetch(&self, scope: SyncScope) -> Result<Vec<Value>, RemoteError>;

    /// Bulk overwrite `scope` with exactly `schemas`
    async fn replace(&self, scope: SyncScope, schemas: Vec<Value>) -> Result<(), RemoteError>;

    /// Create or overwrite `schemas`, leaving every other command in place
    async fn upsert(&self, scope: SyncScope, schemas: Vec<Value>) -> Result<(), RemoteError>;

    /// Delete the commands with local `ids`
    async fn delete(&self, scope: SyncScope, ids: Vec<String>) -> Result<(), RemoteError>;
}

/// [`RemoteRegistry`] over serenity's HTTP client
#[derive(Clone)]
pub struct SerenityRegistry {
    http: Arc<Http>,
}

impl SerenityRegistry {
    /// `http` must have its application id set
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }

    /// Build a client for `token`, resolving the application id when not given
    pub async fn connect(token: &str, application_id: Option<u64>) -> Result<Self, RemoteError> {
        let http = Arc::new(Http::new(token));

        let id = match application_id {
            Some(id) => ApplicationId::new(id),
            None => {
                let info = http.get_current_application_info().await?;
                debug!("Resolved application id {}", info.id);
                info.id
            }
        };
        http.set_application_id(id);

        Ok(Self::new(http))
    }

    pub fn http(&self) -> &Arc<Http> {
        &self.http
    }

    fn ensure_application_id(&self) -> Result<(), RemoteError> {
        self.http
            .application_id()
            .map(|_| ())
            .ok_or(RemoteError::MissingApplicationId)
    }

    async fn commands(&self, scope: SyncScope) -> Result<Vec<Command>, RemoteError> {
        self.ensure_application_id()?;
        let commands = match scope {
            SyncScope::Global => self.http.get_global_commands().await?,
            SyncScope::Development(guild) => self.http.get_guild_commands(guild).await?,
        };
        Ok(commands)
    }

    async fn delete_one(&self, scope: SyncScope, command: CommandId) -> Result<(), RemoteError> {
        match scope {
            SyncScope::Global => self.http.delete_global_command(command).await?,
            SyncScope::Development(guild) => self.http.delete_guild_command(guild, command).await?,
        }
        Ok(())
    }
}

impl std::fmt::Debug for SerenityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerenityRegistry")
            .field("application_id", &self.http.application_id())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl RemoteRegistry for SerenityRegistry {
    async fn fetch(&self, scope: SyncScope) -> Result<Vec<Value>, RemoteError> {
        let commands = self.commands(scope).await?;
        debug!("Fetched {} remote commands for {}", commands.len(), scope);

        commands
            .iter()
            .map(|command| serde_json::to_value(command).map_err(RemoteError::from))
            .collect()
    }

    async fn replace(&self, scope: SyncScope, schemas: Vec<Value>) -> Result<(), RemoteError> {
        self.ensure_application_id()?;
        let written = match scope {
            SyncScope::Global => self.http.create_global_commands(&schemas).await?,
            SyncScope::Development(guild) => self.http.create_guild_commands(guild, &schemas).await?,
        };
        info!("Overwrote {} with {} commands", scope, written.len());
        Ok(())
    }

    async fn upsert(&self, scope: SyncScope, schemas: Vec<Value>) -> Result<(), RemoteError> {
        self.ensure_application_id()?;
        for schema in &schemas {
            match scope {
                SyncScope::Global => self.http.create_global_command(schema).await?,
                SyncScope::Development(guild) => self.http.create_guild_command(guild, schema).await?,
            };
        }
        info!("Upserted {} commands in {}", schemas.len(), scope);
        Ok(())
    }

    async fn delete(&self, scope: SyncScope, ids: Vec<String>) -> Result<(), RemoteError> {
        if ids.is_empty() {
            return Ok(());
        }

        let commands = self.commands(scope).await?;
        for id in &ids {
            let remote = commands.iter().find(|command| {
                serde_json::to_value(command)
                    .ok()
                    .and_then(|value| remote_id(&value))
                    .is_some_and(|remote| &remote == id)
            });

            match remote {
                Some(command) => self.delete_one(scope, command.id).await?,
                None => warn!("Command {} is already absent from {}", id, scope),
            }
        }
        info!("Deleted {} commands from {}", ids.len(), scope);
        Ok(())
    }
}

/// Registry used when no token is configured; every call fails with
/// [`RemoteError::Offline`]. Snapshot checks still work against it.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineRegistry;

#[async_trait]
impl RemoteRegistry for OfflineRegistry {
    async fn fetch(&self, _scope: SyncScope) -> Result<Vec<Value>, RemoteError> {
        Err(RemoteError::Offline)
    }

    async fn replace(&self, _scope: SyncScope, _schemas: Vec<Value>) -> Result<(), RemoteError> {
        Err(RemoteError::Offline)
    }

    async fn upsert(&self, _scope: SyncScope, _schemas: Vec<Value>) -> Result<(), RemoteError> {
        Err(RemoteError::Offline)
    }

    async fn delete(&self, _scope: SyncScope, _ids: Vec<String>) -> Result<(), RemoteError> {
        Err(RemoteError::Offline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_offline_registry_refuses_io() {
        let err = OfflineRegistry.fetch(SyncScope::Global).await.unwrap_err();
        assert!(matches!(err, RemoteError::Offline));
    }
}
