//! Configuration schema definitions using serde with validation attributes.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use switchyard_common::LoggingConfig;
use validator::{Validate, ValidationError, ValidationErrors};

/// Main configuration structure for Switchyard.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Discord application configuration.
    pub discord: DiscordConfig,
    /// Dispatch pipeline behaviour.
    pub dispatch: DispatchConfig,
    /// Permission level resolution.
    pub permissions: PermissionsConfig,
    /// Throttle store maintenance.
    pub throttle: ThrottleConfig,
    /// Command registry reconciliation.
    pub sync: SyncConfig,
    /// Embedded storage.
    pub storage: StorageConfig,
    /// Logging output.
    pub logging: LoggingConfig,
}

/// Discord application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DiscordConfig {
    /// Bot token. Only required for commands that talk to Discord.
    pub token: String,
    /// Application id, resolved from the token when unset.
    pub application_id: Option<u64>,
    /// Guild used as the pinned development command scope.
    pub development_guild_id: Option<u64>,
    /// Request timeout in seconds.
    #[validate(range(min = 1, max = 300, message = "Timeout must be between 1 and 300 seconds"))]
    pub request_timeout_seconds: u64,
    /// Request the privileged guild members intent so member role
    /// changes invalidate cached permission levels immediately.
    pub member_events: bool,
}

/// Dispatch pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DispatchConfig {
    /// Reply to interactions that resolve to no registered command.
    pub reply_to_unknown: bool,
    /// Separator between the routing key and packed data in a custom id.
    #[validate(length(min = 1, max = 8, message = "Delimiter must be 1 to 8 characters"))]
    pub component_data_delimiter: String,
    /// Custom id prefix reserved for message-local collectors.
    #[validate(length(min = 1, max = 32, message = "Opt-out token must be 1 to 32 characters"))]
    pub handler_opt_out_token: String,
    /// Locale used when an interaction carries no usable locale.
    #[validate(length(min = 2, message = "Default locale cannot be empty"))]
    pub default_locale: String,
    /// Optional directory of Fluent resources overriding the bundled ones.
    pub locales_dir: Option<PathBuf>,
}

/// Permission level resolution configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq, Eq)]
#[serde(default)]
pub struct PermissionsConfig {
    /// Users resolved as `Developer`.
    pub developers: Vec<u64>,
    /// Users resolved as `BotAdministrator`.
    pub bot_administrators: Vec<u64>,
    /// Users resolved as `BotOwner`.
    pub bot_owners: Vec<u64>,
    /// Lifetime of a cached level in seconds.
    #[validate(range(min = 1, max = 604_800, message = "Cache TTL must be between 1 second and 7 days"))]
    pub cache_ttl_seconds: u64,
    /// Maximum number of cached `(guild, member)` levels.
    #[validate(range(min = 1, message = "Cache capacity must be positive"))]
    pub cache_capacity: u64,
}

/// Throttle store maintenance configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ThrottleConfig {
    /// Interval between sweeps of expired throttle windows.
    #[validate(range(min = 1, max = 86_400, message = "Cleanup interval must be between 1 second and 1 day"))]
    pub cleanup_interval_seconds: u64,
}

/// Command registry reconciliation configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SyncConfig {
    /// Reconcile the command registry before connecting to the gateway.
    pub on_startup: bool,
    /// Clear the opposite scope after a sync so commands do not show twice.
    pub clear_opposite_scope: bool,
    /// Push the whole manifest regardless of the diff.
    pub force: bool,
}

/// Embedded storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the sled databases.
    pub data_dir: PathBuf,
    /// sled page cache size in megabytes.
    #[validate(range(min = 1, max = 4096, message = "Cache size must be between 1 and 4096 MB"))]
    pub cache_capacity_mb: u64,
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate every section.
    pub fn validate_all(&self) -> Result<(), ValidationErrors> {
        self.discord.validate()?;
        self.dispatch.validate()?;
        self.permissions.validate()?;
        self.throttle.validate()?;
        self.sync.validate()?;
        self.storage.validate()?;

        let mut errors = ValidationErrors::new();

        if self.dispatch.component_data_delimiter.contains('/') {
            let mut error = ValidationError::new("delimiter_contains_slash");
            error.message = Some("Delimiter cannot contain '/', it separates the id prefix".into());
            errors.add("component_data_delimiter", error);
        }

        if !is_valid_log_level(&self.logging.level) {
            let mut error = ValidationError::new("log_level");
            error.message = Some("Log level must be one of: trace, debug, info, warn, error".into());
            errors.add("level", error);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Whether a Discord token is present.
    pub fn has_token(&self) -> bool {
        !self.discord.token.trim().is_empty()
    }
}

/// Accepts a bare level or a full `EnvFilter` directive list.
fn is_valid_log_level(level: &str) -> bool {
    let level = level.trim();
    if level.is_empty() {
        return false;
    }

    level.split(',').all(|directive| {
        let severity = directive.rsplit('=').next().unwrap_or_default().trim();
        LOG_LEVELS.contains(&severity.to_ascii_lowercase().as_str())
    })
}
