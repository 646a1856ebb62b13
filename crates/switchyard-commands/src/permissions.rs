//! Permission levels and the cached, predicate-driven level resolver

use async_trait::async_trait;
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use serenity::all::{GuildId, Permissions, UserId};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use switchyard_config::PermissionsConfig;
use tracing::{debug, warn};

use crate::guild_settings::{GuildDataAccessor, GuildSettings};
use crate::interaction::{GuildInfo, MemberInfo};

/// Authorization levels, totally ordered
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum PermissionLevel {
    #[default]
    User,
    Moderator,
    Administrator,
    ServerOwner,
    Developer,
    BotAdministrator,
    BotOwner,
}

impl PermissionLevel {
    /// Get the permission level name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Moderator => "Moderator",
            Self::Administrator => "Administrator",
            Self::ServerOwner => "ServerOwner",
            Self::Developer => "Developer",
            Self::BotAdministrator => "BotAdministrator",
            Self::BotOwner => "BotOwner",
        }
    }

    /// Fluent key of the display name
    pub fn message_key(&self) -> &'static str {
        match self {
            Self::User => "level-user",
            Self::Moderator => "level-moderator",
            Self::Administrator => "level-administrator",
            Self::ServerOwner => "level-server-owner",
            Self::Developer => "level-developer",
            Self::BotAdministrator => "level-bot-administrator",
            Self::BotOwner => "level-bot-owner",
        }
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a level predicate gets to look at
pub struct LevelContext<'a> {
    pub config: &'a PermissionsConfig,
    pub member: &'a MemberInfo,
    pub guild: &'a GuildInfo,
    pub guild_data: &'a dyn GuildDataAccessor,
}

impl LevelContext<'_> {
    /// Stored settings of the guild, default settings when the lookup fails
    pub async fn guild_settings(&self) -> GuildSettings {
        match self.guild_data.settings(self.guild.id).await {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Failed to load settings for guild {}: {:#}", self.guild.id, e);
                GuildSettings::default()
            }
        }
    }
}

/// Decides whether a member holds a level
#[async_trait]
pub trait LevelPredicate: Send + Sync {
    async fn holds(&self, ctx: &LevelContext<'_>) -> bool;
}

/// A level and the predicate granting it
#[derive(Clone)]
pub struct LevelRule {
    pub level: PermissionLevel,
    pub predicate: Arc<dyn LevelPredicate>,
}

impl LevelRule {
    pub fn new(level: PermissionLevel, predicate: impl LevelPredicate + 'static) -> Self {
        Self {
            level,
            predicate: Arc::new(predicate),
        }
    }
}

impl fmt::Debug for LevelRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LevelRule").field("level", &self.level).finish_non_exhaustive()
    }
}

/// Configured moderator role, or kick + ban + manage messages
#[derive(Debug, Clone, Copy, Default)]
pub struct ModeratorPredicate;

#[async_trait]
impl LevelPredicate for ModeratorPredicate {
    async fn holds(&self, ctx: &LevelContext<'_>) -> bool {
        let settings = ctx.guild_settings().await;
        if !settings.moderator_roles.is_empty() {
            return settings.moderator_roles.iter().any(|r| ctx.member.has_role(*r));
        }

        ctx.member.permissions.contains(
            Permissions::KICK_MEMBERS | Permissions::BAN_MEMBERS | Permissions::MANAGE_MESSAGES,
        )
    }
}

/// Configured admin user or role, or the administrator bit
#[derive(Debug, Clone, Copy, Default)]
pub struct AdministratorPredicate;

#[async_trait]
impl LevelPredicate for AdministratorPredicate {
    async fn holds(&self, ctx: &LevelContext<'_>) -> bool {
        let settings = ctx.guild_settings().await;
        if !settings.admin_users.is_empty() || !settings.admin_roles.is_empty() {
            return settings.admin_users.contains(&ctx.member.user_id)
                || settings.admin_roles.iter().any(|r| ctx.member.has_role(*r));
        }

        ctx.member.permissions.contains(Permissions::ADMINISTRATOR)
    }
}

/// Member owns the guild
#[derive(Debug, Clone, Copy, Default)]
pub struct ServerOwnerPredicate;

#[async_trait]
impl LevelPredicate for ServerOwnerPredicate {
    async fn holds(&self, ctx: &LevelContext<'_>) -> bool {
        ctx.member.user_id == ctx.guild.owner_id
    }
}

/// Which static allow-list of [`PermissionsConfig`] to consult
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowList {
    Developers,
    BotAdministrators,
    BotOwners,
}

#[async_trait]
impl LevelPredicate for AllowList {
    async fn holds(&self, ctx: &LevelContext<'_>) -> bool {
        let list = match self {
            Self::Developers => &ctx.config.developers,
            Self::BotAdministrators => &ctx.config.bot_administrators,
            Self::BotOwners => &ctx.config.bot_owners,
        };
        list.contains(&ctx.member.user_id.get())
    }
}

/// The built-in ladder above `User`
pub fn default_ladder() -> Vec<LevelRule> {
    vec![
        LevelRule::new(PermissionLevel::BotOwner, AllowList::BotOwners),
        LevelRule::new(PermissionLevel::BotAdministrator, AllowList::BotAdministrators),
        LevelRule::new(PermissionLevel::Developer, AllowList::Developers),
        LevelRule::new(PermissionLevel::ServerOwner, ServerOwnerPredicate),
        LevelRule::new(PermissionLevel::Administrator, AdministratorPredicate),
        LevelRule::new(PermissionLevel::Moderator, ModeratorPredicate),
    ]
}

fn cache_key(guild: GuildId, user: UserId) -> String {
    format!("{}:{}", guild, user)
}

/// Resolves the level of a member in a guild, caching the result
pub struct PermissionResolver {
    config: PermissionsConfig,
    rules: Vec<LevelRule>,
    guild_data: Arc<dyn GuildDataAccessor>,
    cache: Cache<String, PermissionLevel>,
}

impl PermissionResolver {
    /// Rules are evaluated highest level first regardless of input order
    pub fn new(
        config: PermissionsConfig,
        mut rules: Vec<LevelRule>,
        guild_data: Arc<dyn GuildDataAccessor>,
    ) -> Self {
        rules.sort_by(|a, b| b.level.cmp(&a.level));

        let cache = Cache::builder()
            .max_capacity(config.cache_capacity)
            .time_to_live(Duration::from_secs(config.cache_ttl_seconds))
            .build();

        Self {
            config,
            rules,
            guild_data,
            cache,
        }
    }

    pub fn with_default_ladder(config: PermissionsConfig, guild_data: Arc<dyn GuildDataAccessor>) -> Self {
        Self::new(config, default_ladder(), guild_data)
    }

    /// Level of `member` in `guild`; `User` when either is absent
    pub async fn resolve(&self, member: Option<&MemberInfo>, guild: Option<&GuildInfo>) -> PermissionLevel {
        let (Some(member), Some(guild)) = (member, guild) else {
            return PermissionLevel::User;
        };

        let key = cache_key(guild.id, member.user_id);
        if let Some(level) = self.cache.get(&key).await {
            debug!("Permission cache hit for {}: {}", key, level);
            return level;
        }

        let level = self.evaluate(member, guild).await;
        self.cache.insert(key, level).await;
        level
    }

    async fn evaluate(&self, member: &MemberInfo, guild: &GuildInfo) -> PermissionLevel {
        let ctx = LevelContext {
            config: &self.config,
            member,
            guild,
            guild_data: self.guild_data.as_ref(),
        };

        for rule in &self.rules {
            if rule.predicate.holds(&ctx).await {
                debug!("User {} resolved as {} in guild {}", member.user_id, rule.level, guild.id);
                return rule.level;
            }
        }

        PermissionLevel::User
    }

    /// Drop every cached level of `guild`
    pub async fn invalidate_guild(&self, guild: GuildId) {
        let prefix = format!("{}:", guild);
        let stale: Vec<Arc<String>> = self
            .cache
            .iter()
            .filter(|(key, _)| key.starts_with(&prefix))
            .map(|(key, _)| key)
            .collect();

        for key in &stale {
            self.cache.invalidate(key.as_str()).await;
        }
        debug!("Invalidated {} cached levels for guild {}", stale.len(), guild);
    }

    /// Drop the cached level of one member
    pub async fn invalidate_member(&self, guild: GuildId, user: UserId) {
        self.cache.invalidate(&cache_key(guild, user)).await;
    }

    pub fn config(&self) -> &PermissionsConfig {
        &self.config
    }
}

impl fmt::Debug for PermissionResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PermissionResolver")
            .field("rules", &self.rules)
            .field("cached", &self.cache.entry_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guild_settings::{MemoryGuildSettings, MockGuildDataAccessor};
    use serenity::all::RoleId;

    fn member(id: u64, permissions: Permissions, roles: Vec<RoleId>) -> MemberInfo {
        MemberInfo {
            user_id: UserId::new(id),
            roles,
            permissions,
        }
    }

    fn guild() -> GuildInfo {
        GuildInfo {
            id: GuildId::new(10),
            owner_id: UserId::new(1),
        }
    }

    fn resolver(guild_data: Arc<dyn GuildDataAccessor>) -> PermissionResolver {
        let config = PermissionsConfig {
            developers: vec![900],
            ..PermissionsConfig::default()
        };
        PermissionResolver::with_default_ladder(config, guild_data)
    }

    #[tokio::test]
    async fn test_absent_member_or_guild_is_user() {
        let resolver = resolver(Arc::new(MemoryGuildSettings::new()));
        let m = member(2, Permissions::all(), vec![]);

        assert_eq!(resolver.resolve(Some(&m), None).await, PermissionLevel::User);
        assert_eq!(resolver.resolve(None, Some(&guild())).await, PermissionLevel::User);
    }

    #[tokio::test]
    async fn test_permission_bit_fallbacks() {
        let resolver = resolver(Arc::new(MemoryGuildSettings::new()));

        let moderator = member(
            2,
            Permissions::KICK_MEMBERS | Permissions::BAN_MEMBERS | Permissions::MANAGE_MESSAGES,
            vec![],
        );
        let kick_only = member(3, Permissions::KICK_MEMBERS, vec![]);
        let admin = member(4, Permissions::ADMINISTRATOR, vec![]);
        let owner = member(1, Permissions::empty(), vec![]);
        let developer = member(900, Permissions::empty(), vec![]);

        assert_eq!(resolver.resolve(Some(&moderator), Some(&guild())).await, PermissionLevel::Moderator);
        assert_eq!(resolver.resolve(Some(&kick_only), Some(&guild())).await, PermissionLevel::User);
        assert_eq!(resolver.resolve(Some(&admin), Some(&guild())).await, PermissionLevel::Administrator);
        assert_eq!(resolver.resolve(Some(&owner), Some(&guild())).await, PermissionLevel::ServerOwner);
        assert_eq!(resolver.resolve(Some(&developer), Some(&guild())).await, PermissionLevel::Developer);
    }

    #[tokio::test]
    async fn test_configured_roles_replace_bit_checks() {
        let store = Arc::new(MemoryGuildSettings::new());
        store
            .store(
                guild().id,
                GuildSettings {
                    moderator_roles: vec![RoleId::new(50)],
                    ..GuildSettings::default()
                },
            )
            .await
            .unwrap();
        let resolver = resolver(store);

        let bits_only = member(
            2,
            Permissions::KICK_MEMBERS | Permissions::BAN_MEMBERS | Permissions::MANAGE_MESSAGES,
            vec![],
        );
        let with_role = member(3, Permissions::empty(), vec![RoleId::new(50)]);

        assert_eq!(resolver.resolve(Some(&bits_only), Some(&guild())).await, PermissionLevel::User);
        assert_eq!(resolver.resolve(Some(&with_role), Some(&guild())).await, PermissionLevel::Moderator);
    }

    #[tokio::test]
    async fn test_failing_settings_lookup_falls_back_to_bits() {
        let mut mock = MockGuildDataAccessor::new();
        mock.expect_settings()
            .returning(|_| Err(anyhow::anyhow!("database unavailable")));
        let resolver = resolver(Arc::new(mock));

        let admin = member(4, Permissions::ADMINISTRATOR, vec![]);
        assert_eq!(resolver.resolve(Some(&admin), Some(&guild())).await, PermissionLevel::Administrator);
    }
}
