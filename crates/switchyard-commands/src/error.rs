//! Error types for command declaration and dispatch

use serenity::all::Permissions;
use thiserror::Error;

/// Registration bugs. These are never recovered from at runtime.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProgrammerError {
    /// The command has no name or custom id to derive an id from
    #[error("Cannot derive an id for a {kind} command without a name or custom id")]
    MissingId { kind: &'static str },

    /// A chat input command was declared without a description
    #[error("Command '{id}' requires a description")]
    MissingDescription { id: String },

    /// Neither a run function nor controllers were declared
    #[error("Command '{id}' declares no handler")]
    MissingHandler { id: String },

    /// Both a run function and controllers were declared
    #[error("Command '{id}' declares both a run handler and controllers")]
    ConflictingHandlers { id: String },

    /// Two commands derived the same id
    #[error("Duplicate command id '{id}'")]
    DuplicateId { id: String },

    /// A controller path does not match any declared subcommand
    #[error("Controller '{path}' of command '{id}' does not match a declared subcommand")]
    UnknownSubPath { id: String, path: String },

    /// The interaction kind does not match the registered command kind
    #[error("Interaction of kind {actual} routed to '{id}' registered as {expected}")]
    KindMismatch {
        id: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// No handler matched the invoked sub-path
    #[error("No handler for '{id}' (sub-path: {path:?})")]
    NoHandler { id: String, path: Option<String> },
}

/// Failures of the platform transport behind an [`Interaction`](crate::Interaction)
#[derive(Debug, Error)]
pub enum InteractionError {
    /// The interaction was already answered
    #[error("Interaction has already been acknowledged")]
    AlreadyAcknowledged,

    /// The operation does not exist for this interaction kind
    #[error("Operation '{0}' is not supported by this interaction")]
    Unsupported(&'static str),

    /// Transport level failure
    #[error("Failed to respond to interaction: {0}")]
    Transport(#[source] switchyard_common::BoxError),
}

impl InteractionError {
    /// Wrap a transport error
    pub fn transport(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Box::new(source))
    }
}

/// Why an interaction was refused before its handler ran
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclineReason {
    /// Globally disabled command
    Disabled,
    /// Guild-only command used outside a guild
    GuildOnly,
    /// Command not enabled for the surface it was used on
    Context,
    /// NSFW-only command used outside an age-restricted channel
    Nsfw,
    /// Guild not on the command's allow-list
    GuildNotAllowed,
    /// Guild data required but not cached
    CacheUnavailable,
    /// Caller below the required level
    Level { required: crate::PermissionLevel },
    /// Caller lacks platform permission bits
    UserPermissions { missing: Permissions },
    /// Bot lacks platform permission bits
    BotPermissions { missing: Permissions },
    /// Caller filtered out by a whitelist dimension
    Whitelist,
    /// Command disabled by the guild's settings
    DisabledInGuild,
    /// Rate limited until `expires_at` (epoch milliseconds)
    Throttled { expires_at: i64 },
}

impl DeclineReason {
    /// Fluent message key describing this reason
    pub fn message_key(&self) -> &'static str {
        match self {
            Self::Disabled => "decline-disabled",
            Self::GuildOnly => "decline-guild-only",
            Self::Context => "decline-context",
            Self::Nsfw => "decline-nsfw",
            Self::GuildNotAllowed => "decline-guild-not-allowed",
            Self::CacheUnavailable => "decline-cache-unavailable",
            Self::Level { .. } => "decline-permission-level",
            Self::UserPermissions { .. } => "decline-user-permissions",
            Self::BotPermissions { .. } => "decline-bot-permissions",
            Self::Whitelist => "decline-whitelist",
            Self::DisabledInGuild => "decline-disabled-in-guild",
            Self::Throttled { .. } => "decline-throttled",
        }
    }
}

impl std::fmt::Display for DeclineReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Level { required } => write!(f, "requires level {}", required),
            Self::UserPermissions { missing } => write!(f, "caller missing {}", missing),
            Self::BotPermissions { missing } => write!(f, "bot missing {}", missing),
            Self::Throttled { expires_at } => write!(f, "throttled until {}", expires_at),
            other => f.write_str(other.message_key().trim_start_matches("decline-")),
        }
    }
}
