//! Error types for internationalization operations

use switchyard_common::SwitchyardError;
use thiserror::Error;

/// Errors that can occur during internationalization operations
#[derive(Error, Debug)]
pub enum I18nError {
    /// Failed to parse a language identifier
    #[error("Invalid language identifier: {0}")]
    InvalidLanguageId(String),

    /// Failed to read a resource file from disk
    #[error("Failed to load resource file {path}: {source}")]
    ResourceLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse a Fluent resource
    #[error("Failed to parse Fluent resource for {locale}: {errors:?}")]
    FluentParse { locale: String, errors: Vec<String> },

    /// Message not found in any bundle
    #[error("Message not found: {key}")]
    MessageNotFound { key: String },

    /// Failed to format a message
    #[error("Failed to format message '{key}': {errors:?}")]
    MessageFormat { key: String, errors: Vec<String> },
}

impl From<I18nError> for SwitchyardError {
    fn from(err: I18nError) -> Self {
        let locale = match &err {
            I18nError::FluentParse { locale, .. } => Some(locale.clone()),
            _ => None,
        };
        SwitchyardError::localization(err.to_string(), locale)
    }
}

/// Result type for i18n operations
pub type I18nResult<T> = Result<T, I18nError>;
