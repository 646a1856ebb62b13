//! Command catalogs a manifest can be reconciled against

use serde::{Deserialize, Serialize};
use serenity::all::GuildId;
use std::fmt;

/// The global catalog or the pinned development guild catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", content = "guild_id", rename_all = "lowercase")]
pub enum SyncScope {
    Global,
    Development(GuildId),
}

impl SyncScope {
    /// Pick the scope for a requested name
    pub fn development_or_global(development: bool, guild: Option<GuildId>) -> Option<Self> {
        match (development, guild) {
            (false, _) => Some(Self::Global),
            (true, Some(guild)) => Some(Self::Development(guild)),
            (true, None) => None,
        }
    }

    /// Stable key used to namespace persisted snapshots
    pub fn key(&self) -> String {
        match self {
            Self::Global => "global".to_string(),
            Self::Development(guild) => format!("guild:{}", guild),
        }
    }

    /// Scope whose commands would show next to this one's
    pub fn opposite(&self, development_guild: Option<GuildId>) -> Option<Self> {
        match self {
            Self::Global => development_guild.map(Self::Development),
            Self::Development(_) => Some(Self::Global),
        }
    }

    pub fn guild_id(&self) -> Option<GuildId> {
        match self {
            Self::Global => None,
            Self::Development(guild) => Some(*guild),
        }
    }
}

impl fmt::Display for SyncScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => f.write_str("global"),
            Self::Development(guild) => write!(f, "development guild {}", guild),
        }
    }
}
