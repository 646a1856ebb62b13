//! sled-backed guild settings

use anyhow::{Context, Result};
use async_trait::async_trait;
use serenity::all::GuildId;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::guild_settings::{GuildDataAccessor, GuildSettings};

const SETTINGS_TREE: &str = "guild_settings";

/// Guild settings persisted in a sled tree, one JSON value per guild
#[derive(Debug, Clone)]
pub struct GuildDatabase {
    db: Arc<sled::Db>,
    settings_tree: sled::Tree,
}

impl GuildDatabase {
    /// Open or create the database at `db_path`
    pub fn open<P: AsRef<Path>>(db_path: P, cache_capacity_mb: u64) -> Result<Self> {
        info!("Opening guild settings database at: {:?}", db_path.as_ref());

        let db = sled::Config::default()
            .path(db_path.as_ref())
            .cache_capacity(cache_capacity_mb * 1024 * 1024)
            .flush_every_ms(Some(1000))
            .open()
            .with_context(|| format!("Failed to open database at {:?}", db_path.as_ref()))?;

        Self::from_db(Arc::new(db))
    }

    /// Use a tree of an already opened database
    pub fn from_db(db: Arc<sled::Db>) -> Result<Self> {
        let settings_tree = db
            .open_tree(SETTINGS_TREE)
            .context("Failed to open guild settings tree")?;

        Ok(Self { db, settings_tree })
    }

    /// Guild ids that have stored settings
    pub fn guild_ids(&self) -> Result<Vec<GuildId>> {
        let mut ids = Vec::new();
        for entry in self.settings_tree.iter() {
            let (key, _) = entry.context("Failed to iterate over guild settings tree")?;
            match <[u8; 8]>::try_from(key.as_ref()) {
                Ok(bytes) => ids.push(GuildId::new(u64::from_be_bytes(bytes))),
                Err(_) => warn!("Found invalid key length in guild settings tree: {} bytes", key.len()),
            }
        }
        Ok(ids)
    }

    /// Remove the settings of a guild the bot has left
    pub async fn remove(&self, guild: GuildId) -> Result<bool> {
        let existed = self
            .settings_tree
            .remove(guild.get().to_be_bytes())
            .context("Failed to delete guild settings")?
            .is_some();

        if existed {
            self.settings_tree
                .flush_async()
                .await
                .context("Failed to flush guild settings deletion")?;
        }
        Ok(existed)
    }

    /// Underlying database handle
    pub fn db(&self) -> &Arc<sled::Db> {
        &self.db
    }
}

#[async_trait]
impl GuildDataAccessor for GuildDatabase {
    async fn settings(&self, guild: GuildId) -> Result<GuildSettings> {
        match self
            .settings_tree
            .get(guild.get().to_be_bytes())
            .context("Failed to query guild settings")?
        {
            Some(data) => serde_json::from_slice(&data).context("Failed to deserialize guild settings"),
            None => {
                debug!("No settings stored for guild {}", guild);
                Ok(GuildSettings::default())
            }
        }
    }

    async fn store(&self, guild: GuildId, settings: GuildSettings) -> Result<()> {
        let data = serde_json::to_vec(&settings).context("Failed to serialize guild settings")?;

        self.settings_tree
            .insert(guild.get().to_be_bytes(), data)
            .context("Failed to insert guild settings")?;
        self.settings_tree
            .flush_async()
            .await
            .context("Failed to flush guild settings to disk")?;

        debug!("Stored settings for guild {}", guild);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serenity::all::RoleId;

    #[tokio::test]
    async fn test_settings_persist_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("guilds.db");
        let guild = GuildId::new(77);

        {
            let db = GuildDatabase::open(&path, 8).unwrap();
            let settings = GuildSettings {
                moderator_roles: vec![RoleId::new(5)],
                ..GuildSettings::default()
            };
            db.store(guild, settings).await.unwrap();
        }

        let db = GuildDatabase::open(&path, 8).unwrap();
        let settings = db.settings(guild).await.unwrap();
        assert_eq!(settings.moderator_roles, vec![RoleId::new(5)]);
        assert_eq!(db.guild_ids().unwrap(), vec![guild]);

        assert!(db.remove(guild).await.unwrap());
        assert!(!db.remove(guild).await.unwrap());
    }
}
