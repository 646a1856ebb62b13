//! Per-guild configuration consulted by permission predicates and dispatch

use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serenity::all::{GuildId, RoleId, UserId};
use std::sync::Arc;
use tracing::debug;

use crate::permissions::PermissionResolver;

/// Role and command configuration of one guild
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuildSettings {
    /// Roles resolved as `Moderator`
    pub moderator_roles: Vec<RoleId>,
    /// Roles resolved as `Administrator`
    pub admin_roles: Vec<RoleId>,
    /// Users resolved as `Administrator`
    pub admin_users: Vec<UserId>,
    /// Command ids refused in this guild
    pub disabled_commands: Vec<String>,
}

impl GuildSettings {
    pub fn is_disabled(&self, command_id: &str) -> bool {
        self.disabled_commands.iter().any(|id| id == command_id)
    }
}

/// Storage of [`GuildSettings`]
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GuildDataAccessor: Send + Sync {
    /// Settings of `guild`, default settings when none are stored
    async fn settings(&self, guild: GuildId) -> Result<GuildSettings>;

    /// Replace the settings of `guild`
    async fn store(&self, guild: GuildId, settings: GuildSettings) -> Result<()>;
}

/// In-memory settings, lost on restart
#[derive(Debug, Default)]
pub struct MemoryGuildSettings {
    guilds: DashMap<GuildId, GuildSettings>,
}

impl MemoryGuildSettings {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GuildDataAccessor for MemoryGuildSettings {
    async fn settings(&self, guild: GuildId) -> Result<GuildSettings> {
        Ok(self.guilds.get(&guild).map(|s| s.clone()).unwrap_or_default())
    }

    async fn store(&self, guild: GuildId, settings: GuildSettings) -> Result<()> {
        self.guilds.insert(guild, settings);
        Ok(())
    }
}

/// Read-modify-write access to guild settings that keeps the permission
/// cache coherent.
#[derive(Clone)]
pub struct GuildSettingsManager {
    store: Arc<dyn GuildDataAccessor>,
    permissions: Arc<PermissionResolver>,
}

impl GuildSettingsManager {
    pub fn new(store: Arc<dyn GuildDataAccessor>, permissions: Arc<PermissionResolver>) -> Self {
        Self { store, permissions }
    }

    pub async fn get(&self, guild: GuildId) -> Result<GuildSettings> {
        self.store.settings(guild).await
    }

    /// Apply `update_fn` and invalidate cached levels of the guild
    pub async fn update<F>(&self, guild: GuildId, update_fn: F) -> Result<GuildSettings>
    where
        F: FnOnce(&mut GuildSettings) + Send,
    {
        let mut settings = self.store.settings(guild).await?;
        update_fn(&mut settings);
        self.store.store(guild, settings.clone()).await?;

        self.permissions.invalidate_guild(guild).await;
        debug!("Updated settings for guild {}", guild);
        Ok(settings)
    }
}

impl std::fmt::Debug for GuildSettingsManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuildSettingsManager").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_settings_default_when_missing() {
        let store = MemoryGuildSettings::new();
        let guild = GuildId::new(1);

        assert_eq!(store.settings(guild).await.unwrap(), GuildSettings::default());

        let settings = GuildSettings {
            disabled_commands: vec!["ChatInput/ping".into()],
            ..GuildSettings::default()
        };
        store.store(guild, settings.clone()).await.unwrap();

        let loaded = store.settings(guild).await.unwrap();
        assert!(loaded.is_disabled("ChatInput/ping"));
        assert!(!loaded.is_disabled("ChatInput/pong"));
    }
}
