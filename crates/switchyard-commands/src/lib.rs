//! # Switchyard Commands
//!
//! Command model and interaction dispatch for Switchyard.
//!
//! Commands are declared with [`CommandBuilder`], frozen into a
//! [`CommandRegistry`] and served by a [`Dispatcher`], which applies
//! eligibility, the permission ladder and throttling before invoking a
//! handler. The registry also yields the manifest reconciled with the
//! platform by `switchyard-sync`.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod command;
pub mod database;
pub mod dispatch;
pub mod error;
pub mod guild_settings;
pub mod handler;
pub mod identifier;
pub mod interaction;
pub mod kind;
pub mod messages;
pub mod metrics;
pub mod permissions;
pub mod registry;
pub mod schema;
pub mod throttle;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use command::{
    command_id, Command, CommandBuilder, Contexts, Enablement, InteractionOptions, Localizer, NoLocalization,
    Requirements, Whitelist, DEFAULT_CATEGORY,
};
pub use database::GuildDatabase;
pub use dispatch::{DispatchOutcome, DispatchServices, Dispatcher};
pub use error::{DeclineReason, InteractionError, ProgrammerError};
pub use guild_settings::{GuildDataAccessor, GuildSettings, GuildSettingsManager, MemoryGuildSettings};
pub use handler::{CommandHandler, Handler, Invocation};
pub use identifier::{IdentifierResolver, Resolution};
pub use interaction::{AutocompleteChoice, GuildInfo, Interaction, MemberInfo, Reply, Surface};
pub use kind::{CommandKind, InteractionKind};
pub use messages::{Messages, PlainMessages};
pub use metrics::{CommandMetrics, ExecutionOutcome, ExecutionRecord, ExecutionRecorder, MetricsManager};
pub use permissions::{
    default_ladder, AdministratorPredicate, AllowList, LevelContext, LevelPredicate, LevelRule, ModeratorPredicate,
    PermissionLevel, PermissionResolver, ServerOwnerPredicate,
};
pub use registry::{CommandRegistry, ManifestEntry};
pub use schema::{CommandOption, CommandSchema, Localizations, OptionType};
pub use throttle::{
    scope_key, MemoryThrottleStore, ThrottleResult, ThrottleScope, ThrottleSettings, ThrottleStore,
    ThrottleTarget, Throttler,
};
