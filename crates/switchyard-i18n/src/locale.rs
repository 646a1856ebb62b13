//! Supported locales and their mapping onto Discord locale codes

use crate::error::{I18nError, I18nResult};
use serde::{Deserialize, Serialize};
use unic_langid::LanguageIdentifier;

/// Supported locales
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub enum Locale {
    #[default]
    English,
    Spanish,
    French,
    German,
}

impl Locale {
    /// Get the language code for this locale
    pub fn code(&self) -> &'static str {
        match self {
            Self::English => "en-US",
            Self::Spanish => "es-ES",
            Self::French => "fr",
            Self::German => "de",
        }
    }

    /// Get the short language code for this locale
    pub fn short_code(&self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Spanish => "es",
            Self::French => "fr",
            Self::German => "de",
        }
    }

    /// Discord locale codes served by this locale.
    ///
    /// These are the keys used in `name_localizations` and
    /// `description_localizations` of a command payload.
    pub fn discord_codes(&self) -> &'static [&'static str] {
        match self {
            Self::English => &["en-US", "en-GB"],
            Self::Spanish => &["es-ES", "es-419"],
            Self::French => &["fr"],
            Self::German => &["de"],
        }
    }

    /// Parse a locale from a language or Discord locale code
    pub fn from_code(code: &str) -> Option<Self> {
        let primary = code.split(['-', '_']).next().unwrap_or_default();
        match primary.to_ascii_lowercase().as_str() {
            "en" => Some(Self::English),
            "es" => Some(Self::Spanish),
            "fr" => Some(Self::French),
            "de" => Some(Self::German),
            _ => None,
        }
    }

    /// Convert to Fluent LanguageIdentifier
    pub fn to_language_identifier(&self) -> I18nResult<LanguageIdentifier> {
        self.code()
            .parse()
            .map_err(|_| I18nError::InvalidLanguageId(self.code().to_string()))
    }

    /// Get all supported locales
    pub fn all() -> [Self; 4] {
        [Self::English, Self::Spanish, Self::French, Self::German]
    }

    /// Get the resource file name for this locale
    pub fn resource_file(&self) -> String {
        format!("{}/main.ftl", self.short_code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_discord_codes() {
        assert_eq!(Locale::from_code("en-GB"), Some(Locale::English));
        assert_eq!(Locale::from_code("es-419"), Some(Locale::Spanish));
        assert_eq!(Locale::from_code("de"), Some(Locale::German));
        assert_eq!(Locale::from_code("ja"), None);
    }

    #[test]
    fn test_language_identifiers_parse() {
        for locale in Locale::all() {
            assert!(locale.to_language_identifier().is_ok());
        }
    }
}
