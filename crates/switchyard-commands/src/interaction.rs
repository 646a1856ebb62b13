//! Platform-neutral view of an inbound interaction

use crate::error::InteractionError;
use crate::kind::InteractionKind;
use async_trait::async_trait;
use serenity::all::{ChannelId, GuildId, Permissions, RoleId, UserId};

/// Where an interaction was triggered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Surface {
    Guild,
    BotDm,
    PrivateChannel,
}

/// Guild member issuing an interaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberInfo {
    pub user_id: UserId,
    pub roles: Vec<RoleId>,
    /// Effective permissions in the invoking channel
    pub permissions: Permissions,
}

impl MemberInfo {
    pub fn has_role(&self, role: RoleId) -> bool {
        self.roles.contains(&role)
    }
}

/// Cached guild data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuildInfo {
    pub id: GuildId,
    pub owner_id: UserId,
}

/// Response message
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reply {
    pub content: String,
    pub ephemeral: bool,
}

impl Reply {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: false,
        }
    }

    pub fn ephemeral(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: true,
        }
    }
}

/// One autocomplete suggestion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutocompleteChoice {
    pub name: String,
    pub value: String,
}

impl AutocompleteChoice {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// An inbound interaction together with its acknowledgment operations.
///
/// Implementations answer from data already carried by the event; only the
/// acknowledgment methods perform I/O.
#[async_trait]
pub trait Interaction: Send + Sync {
    fn kind(&self) -> InteractionKind;

    /// Declared command name for application commands
    fn command_name(&self) -> Option<String>;

    /// Custom id for components and modals
    fn custom_id(&self) -> Option<String>;

    /// Name of the focused option of an autocomplete request
    fn focused_option(&self) -> Option<String>;

    fn subcommand_group(&self) -> Option<String>;

    fn subcommand(&self) -> Option<String>;

    /// Value of the named option of the invoked (sub)command, as text.
    ///
    /// Mentionable and entity options yield their snowflake.
    fn option(&self, name: &str) -> Option<String>;

    fn user_id(&self) -> UserId;

    fn guild_id(&self) -> Option<GuildId>;

    fn channel_id(&self) -> ChannelId;

    /// Parent category of the invoking channel
    fn channel_category_id(&self) -> Option<ChannelId>;

    /// Whether the invoking channel is age-restricted
    fn channel_nsfw(&self) -> bool;

    fn surface(&self) -> Surface;

    /// Invoking member, absent outside guilds
    fn member(&self) -> Option<MemberInfo>;

    /// Guild data, absent outside guilds or when not cached
    fn guild(&self) -> Option<GuildInfo>;

    /// Permissions of the application in the invoking channel
    fn app_permissions(&self) -> Option<Permissions>;

    /// Locale code selected by the invoking user
    fn locale(&self) -> String;

    fn is_acknowledged(&self) -> bool;

    /// Whether a user-visible reply has been sent
    fn is_replied(&self) -> bool;

    /// Acknowledge now and answer later
    async fn defer(&self, ephemeral: bool) -> Result<(), InteractionError>;

    /// Send the response, or a follow-up once acknowledged
    async fn reply(&self, reply: Reply) -> Result<(), InteractionError>;

    /// Answer an autocomplete request
    async fn autocomplete(&self, choices: Vec<AutocompleteChoice>) -> Result<(), InteractionError>;
}
