//! # Switchyard I18n
//!
//! Fluent localization for Switchyard.
//!
//! Resources for every supported locale are compiled into the binary and can
//! be overridden from an on-disk directory laid out as `<lang>/main.ftl`.
//! The manager formats decline and failure replies and produces the
//! `name_localizations` / `description_localizations` maps attached to
//! command payloads.
//!
//! # Example
//!
//! ```rust
//! use switchyard_i18n::{fluent_args, I18nManager, Locale};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = I18nManager::bundled(Locale::English)?;
//! let args = fluent_args!["level" => "Moderator"];
//! let message = manager.get_message("decline-permission-level", Locale::Spanish, args.as_ref())?;
//! assert!(message.contains("Moderator"));
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod bundle;
pub mod error;
pub mod locale;
pub mod manager;
pub mod resource;

pub use bundle::{fluent_args, BundleManager};
pub use error::{I18nError, I18nResult};
pub use locale::Locale;
pub use manager::I18nManager;
pub use resource::ResourceManager;

pub use fluent_bundle::{FluentArgs, FluentValue};
