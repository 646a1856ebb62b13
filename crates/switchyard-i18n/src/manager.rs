//! Internationalization manager

use crate::bundle::BundleManager;
use crate::error::{I18nError, I18nResult};
use crate::resource::ResourceManager;
use crate::Locale;
use fluent_bundle::FluentArgs;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Resolves localized strings with fallback to a default locale
#[derive(Debug)]
pub struct I18nManager {
    default_locale: Locale,
    resources: ResourceManager,
    bundles: BundleManager,
}

impl I18nManager {
    /// Load every supported locale through `resources`.
    ///
    /// Failing to load the default locale is an error; other locales are
    /// skipped with a warning.
    pub fn new(default_locale: Locale, resources: ResourceManager) -> I18nResult<Self> {
        let mut manager = Self {
            default_locale,
            resources,
            bundles: BundleManager::new(),
        };

        manager.load_locale(default_locale)?;
        for locale in Locale::all() {
            if locale == default_locale {
                continue;
            }
            if let Err(e) = manager.load_locale(locale) {
                warn!("Failed to load locale {:?}: {}", locale, e);
            }
        }

        info!(
            "I18nManager initialized with default locale {:?} ({} locales loaded)",
            default_locale,
            manager.bundles.available_locales().len()
        );
        Ok(manager)
    }

    /// Manager over the resources compiled into the binary
    pub fn bundled(default_locale: Locale) -> I18nResult<Self> {
        Self::new(default_locale, ResourceManager::bundled())
    }

    fn load_locale(&mut self, locale: Locale) -> I18nResult<()> {
        debug!("Loading locale: {:?}", locale);
        let resource = self.resources.load_resource(locale)?;
        self.bundles.add_resource(locale, resource)
    }

    /// Get a localized message, falling back to the default locale
    pub fn get_message(&self, key: &str, locale: Locale, args: Option<&FluentArgs>) -> I18nResult<String> {
        if self.bundles.has_message(locale, key) {
            return self.bundles.format_message(locale, key, args);
        }

        if locale != self.default_locale && self.bundles.has_message(self.default_locale, key) {
            debug!(
                "Message '{}' not found in locale {:?}, falling back to {:?}",
                key, locale, self.default_locale
            );
            return self.bundles.format_message(self.default_locale, key, args);
        }

        Err(I18nError::MessageNotFound { key: key.to_string() })
    }

    /// Get a localized message or `default` when it cannot be produced
    pub fn get_message_or_default(
        &self,
        key: &str,
        locale: Locale,
        args: Option<&FluentArgs>,
        default: &str,
    ) -> String {
        self.get_message(key, locale, args).unwrap_or_else(|e| {
            warn!("Message '{}' unavailable ({}), using default", key, e);
            default.to_string()
        })
    }

    /// Translations of `key` keyed by Discord locale code.
    ///
    /// Only locales that define `key` themselves are included, so the
    /// platform falls back to the base string for the rest.
    pub fn localizations(&self, key: &str) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        for locale in self.bundles.available_locales() {
            if !self.bundles.has_message(locale, key) {
                continue;
            }
            match self.bundles.format_message(locale, key, None) {
                Ok(text) => {
                    for code in locale.discord_codes() {
                        out.insert((*code).to_string(), text.clone());
                    }
                }
                Err(e) => warn!("Skipping localization '{}' for {:?}: {}", key, locale, e),
            }
        }
        out
    }

    /// Check if a message exists for the given locale or the default
    pub fn has_message(&self, key: &str, locale: Locale) -> bool {
        self.bundles.has_message(locale, key)
            || (locale != self.default_locale && self.bundles.has_message(self.default_locale, key))
    }

    /// Get the default locale
    pub fn default_locale(&self) -> Locale {
        self.default_locale
    }

    /// Locale for a Discord locale code, or the default
    pub fn resolve_locale(&self, code: &str) -> Locale {
        Locale::from_code(code).unwrap_or(self.default_locale)
    }

    /// Get all loaded locales
    pub fn loaded_locales(&self) -> Vec<Locale> {
        self.bundles.available_locales()
    }
}
