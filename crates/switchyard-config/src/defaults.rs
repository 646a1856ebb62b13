//! Default values for every configuration section.

use crate::schema::*;
use std::path::PathBuf;

/// Default component data delimiter.
pub const DEFAULT_COMPONENT_DATA_DELIMITER: &str = "#";
/// Default handler opt-out token.
pub const DEFAULT_HANDLER_OPT_OUT_TOKEN: &str = "collector:";
/// Default permission cache lifetime in seconds.
pub const DEFAULT_PERMISSION_CACHE_TTL_SECONDS: u64 = 3600;

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            application_id: None,
            development_guild_id: None,
            request_timeout_seconds: 30,
            member_events: false,
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            reply_to_unknown: false,
            component_data_delimiter: DEFAULT_COMPONENT_DATA_DELIMITER.to_string(),
            handler_opt_out_token: DEFAULT_HANDLER_OPT_OUT_TOKEN.to_string(),
            default_locale: "en-US".to_string(),
            locales_dir: None,
        }
    }
}

impl Default for PermissionsConfig {
    fn default() -> Self {
        Self {
            developers: Vec::new(),
            bot_administrators: Vec::new(),
            bot_owners: Vec::new(),
            cache_ttl_seconds: DEFAULT_PERMISSION_CACHE_TTL_SECONDS,
            cache_capacity: 10_000,
        }
    }
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            cleanup_interval_seconds: 300,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            on_startup: true,
            clear_opposite_scope: false,
            force: false,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            cache_capacity_mb: 64,
        }
    }
}
