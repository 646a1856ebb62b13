//! Error types and utilities shared by every Switchyard crate

use thiserror::Error;

/// Boxed error source carried by [`SwitchyardError`] variants
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type alias for Switchyard operations
pub type Result<T> = std::result::Result<T, SwitchyardError>;

/// Top-level error type for Switchyard operations
#[derive(Error, Debug)]
pub enum SwitchyardError {
    /// Configuration related errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// I/O related errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Discord API related errors
    #[error("Discord API error: {message}")]
    Discord {
        message: String,
        status_code: Option<u16>,
        #[source]
        source: Option<BoxError>,
    },

    /// Persistence related errors
    #[error("Storage error: {message}")]
    Storage {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internationalization and localization errors
    #[error("Localization error: {message}")]
    Localization {
        message: String,
        locale: Option<String>,
    },

    /// Validation errors for configuration or declarations
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    /// Generic error with custom message
    #[error("{message}")]
    Generic {
        message: String,
        #[source]
        source: Option<BoxError>,
    },
}

impl SwitchyardError {
    /// Create a new generic error with a custom message
    pub fn new(msg: impl Into<String>) -> Self {
        Self::Generic {
            message: msg.into(),
            source: None,
        }
    }

    /// Create a new generic error with a custom message and source
    pub fn with_source(
        msg: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Generic {
            message: msg.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
            source: None,
        }
    }

    /// Create a new configuration error with source
    pub fn config_with_source(
        msg: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            message: msg.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a new Discord API error
    pub fn discord(msg: impl Into<String>) -> Self {
        Self::Discord {
            message: msg.into(),
            status_code: None,
            source: None,
        }
    }

    /// Create a new Discord API error with source
    pub fn discord_with_source(
        msg: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Discord {
            message: msg.into(),
            status_code: None,
            source: Some(Box::new(source)),
        }
    }

    /// Create a new storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage {
            message: msg.into(),
            source: None,
        }
    }

    /// Create a new storage error with source
    pub fn storage_with_source(
        msg: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Storage {
            message: msg.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a new localization error
    pub fn localization(msg: impl Into<String>, locale: Option<String>) -> Self {
        Self::Localization {
            message: msg.into(),
            locale,
        }
    }

    /// Create a new validation error with field name
    pub fn validation_field(msg: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
            field: Some(field.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{error::Error, io};

    #[test]
    fn test_error_display_formatting() {
        assert_eq!(SwitchyardError::new("boom").to_string(), "boom");
        assert_eq!(
            SwitchyardError::config("missing token").to_string(),
            "Configuration error: missing token"
        );
        assert_eq!(
            SwitchyardError::storage("tree unavailable").to_string(),
            "Storage error: tree unavailable"
        );
        assert_eq!(
            SwitchyardError::validation_field("must be positive", "limit").to_string(),
            "Validation error: must be positive"
        );
    }

    #[test]
    fn test_error_with_source() {
        let wrapped = SwitchyardError::storage_with_source(
            "Failed to open snapshot tree",
            io::Error::new(io::ErrorKind::PermissionDenied, "Access denied"),
        );

        assert!(wrapped.to_string().contains("Failed to open snapshot tree"));
        assert!(wrapped.source().is_some());
    }

    #[test]
    fn test_conversions() {
        let io_error: SwitchyardError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(io_error.to_string().starts_with("I/O error"));

        let serde_error = serde_json::from_str::<serde_json::Value>("{nope}").unwrap_err();
        let converted: SwitchyardError = serde_error.into();
        assert!(converted.to_string().starts_with("Serialization error"));
    }

    #[test]
    fn test_error_chain_preservation() {
        let root = io::Error::new(io::ErrorKind::NotFound, "Root cause");
        let middle = SwitchyardError::config_with_source("Middle layer", root);
        let top = SwitchyardError::with_source("Top layer", middle);

        let mut current: &dyn Error = &top;
        let mut depth = 0;
        while let Some(source) = current.source() {
            current = source;
            depth += 1;
        }

        assert_eq!(depth, 2);
    }
}
