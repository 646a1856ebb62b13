//! Configuration loading from YAML with environment variable overrides.

use crate::schema::Config;
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use switchyard_common::SwitchyardError;
use thiserror::Error;
use tracing::{debug, info};

/// Environment variable naming an explicit configuration file.
pub const CONFIG_PATH_VAR: &str = "SWITCHYARD_CONFIG_PATH";

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error when reading configuration file
    #[error("Failed to read configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parsing error
    #[error("Failed to parse YAML configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Configuration validation error
    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// Environment variable parsing error
    #[error("Failed to parse environment variable '{var}': {message}")]
    EnvParse { var: String, message: String },
}

impl From<ConfigError> for SwitchyardError {
    fn from(err: ConfigError) -> Self {
        SwitchyardError::config_with_source("Configuration loading failed", err)
    }
}

/// Configuration loader for the application
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from the conventional locations.
    ///
    /// Tries `$SWITCHYARD_CONFIG_PATH`, then `config.yaml` and `config.yml`
    /// in the working directory, then falls back to defaults. Environment
    /// overrides are applied in every case.
    pub fn load() -> Result<Config, ConfigError> {
        if let Ok(path) = env::var(CONFIG_PATH_VAR) {
            return Self::load_from_file(path);
        }

        for candidate in ["config.yaml", "config.yml"] {
            if Path::new(candidate).exists() {
                return Self::load_from_file(candidate);
            }
        }

        info!("No configuration file found, using defaults");
        Self::finish(Config::default(), |var| env::var(var).ok())
    }

    /// Load configuration from a specific YAML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let path = path.as_ref();
        debug!("Loading configuration from {:?}", path);

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::parse(&content)?;
        info!("Loaded configuration from {:?}", path);

        Self::finish(config, |var| env::var(var).ok())
    }

    /// Parse a YAML document without applying overrides or validation.
    pub fn parse(content: &str) -> Result<Config, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Config::default());
        }

        Ok(serde_yaml::from_str(content)?)
    }

    /// Apply overrides from `lookup` and validate.
    pub fn finish<F>(mut config: Config, lookup: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::apply_overrides(&mut config, &lookup)?;
        config.validate_all()?;

        Ok(config)
    }

    fn apply_overrides<F>(config: &mut Config, lookup: &F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("DISCORD_TOKEN") {
            config.discord.token = token;
        }

        if let Some(id) = parse_var::<u64, _>(lookup, "DISCORD_APPLICATION_ID")? {
            config.discord.application_id = Some(id);
        }

        if let Some(id) = parse_var::<u64, _>(lookup, "SWITCHYARD_DEV_GUILD")? {
            config.discord.development_guild_id = Some(id);
        }

        if let Some(flag) = parse_var::<bool, _>(lookup, "SWITCHYARD_REPLY_UNKNOWN")? {
            config.dispatch.reply_to_unknown = flag;
        }

        if let Some(locale) = lookup("SWITCHYARD_DEFAULT_LOCALE") {
            config.dispatch.default_locale = locale;
        }

        if let Some(ttl) = parse_var::<u64, _>(lookup, "SWITCHYARD_PERMISSION_CACHE_TTL")? {
            config.permissions.cache_ttl_seconds = ttl;
        }

        if let Some(flag) = parse_var::<bool, _>(lookup, "SWITCHYARD_SYNC_ON_STARTUP")? {
            config.sync.on_startup = flag;
        }

        if let Some(dir) = lookup("SWITCHYARD_DATA_DIR") {
            config.storage.data_dir = PathBuf::from(dir);
        }

        if let Some(level) = lookup("SWITCHYARD_LOG_LEVEL") {
            config.logging.level = level;
        }

        Ok(())
    }
}

fn parse_var<T, F>(lookup: &F, var: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::EnvParse {
                var: var.to_string(),
                message: e.to_string(),
            }),
        None => Ok(None),
    }
}
