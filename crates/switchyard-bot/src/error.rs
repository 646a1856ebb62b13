//! Application-wide error types using thiserror.

use switchyard_commands::ProgrammerError;
use switchyard_common::SwitchyardError;
use switchyard_config::ConfigError;
use switchyard_sync::{RemoteError, SyncError};

/// Main application error type.
#[derive(thiserror::Error, Debug)]
pub enum BotError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Error raised by a shared component.
    #[error(transparent)]
    Core(#[from] SwitchyardError),

    /// Command declarations are invalid.
    #[error("Invalid command registration: {0}")]
    Registration(#[from] ProgrammerError),

    /// Discord/Serenity error.
    #[error("Discord error: {0}")]
    Discord(#[from] serenity::Error),

    /// The command registry could not be reached.
    #[error("Command registry error: {0}")]
    Remote(#[from] RemoteError),

    /// Reconciliation failed.
    #[error("Command sync failed: {0}")]
    Sync(#[from] SyncError),

    /// Operation needs a setting that is missing.
    #[error("{0}")]
    Missing(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<switchyard_i18n::I18nError> for BotError {
    fn from(err: switchyard_i18n::I18nError) -> Self {
        Self::Core(err.into())
    }
}

/// Result type for the bot application.
pub type BotResult<T> = Result<T, BotError>;
