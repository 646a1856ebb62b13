//! Resource management for Fluent files

use crate::error::{I18nError, I18nResult};
use crate::Locale;
use fluent_bundle::FluentResource;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

const BUNDLED_EN: &str = include_str!("../locales/en/main.ftl");
const BUNDLED_ES: &str = include_str!("../locales/es/main.ftl");
const BUNDLED_FR: &str = include_str!("../locales/fr/main.ftl");
const BUNDLED_DE: &str = include_str!("../locales/de/main.ftl");

/// Loads Fluent resources, preferring an on-disk directory over the
/// resources compiled into the binary.
#[derive(Debug, Clone, Default)]
pub struct ResourceManager {
    base_dir: Option<PathBuf>,
}

impl ResourceManager {
    /// Use only the bundled resources
    pub fn bundled() -> Self {
        Self { base_dir: None }
    }

    /// Look up `<base_dir>/<lang>/main.ftl` first
    pub fn with_directory<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            base_dir: Some(base_dir.as_ref().to_path_buf()),
        }
    }

    /// Source text of the bundled resource for `locale`
    pub fn bundled_source(locale: Locale) -> &'static str {
        match locale {
            Locale::English => BUNDLED_EN,
            Locale::Spanish => BUNDLED_ES,
            Locale::French => BUNDLED_FR,
            Locale::German => BUNDLED_DE,
        }
    }

    /// Load and parse the resource for `locale`
    pub fn load_resource(&self, locale: Locale) -> I18nResult<FluentResource> {
        let source = self.read_source(locale)?;

        FluentResource::try_new(source).map_err(|(_, errors)| {
            let errors: Vec<String> = errors.into_iter().map(|e| format!("{:?}", e)).collect();
            error!("Failed to parse Fluent resource for {:?}: {:?}", locale, errors);

            I18nError::FluentParse {
                locale: locale.code().to_string(),
                errors,
            }
        })
    }

    fn read_source(&self, locale: Locale) -> I18nResult<String> {
        if let Some(base_dir) = &self.base_dir {
            let path = base_dir.join(locale.resource_file());
            if path.exists() {
                debug!("Loading resource file: {:?}", path);
                return fs::read_to_string(&path).map_err(|source| I18nError::ResourceLoad {
                    path: path.to_string_lossy().to_string(),
                    source,
                });
            }
            debug!("No override for {:?} at {:?}, using bundled resource", locale, path);
        }

        Ok(Self::bundled_source(locale).to_string())
    }

    /// Get the override directory, if any
    pub fn base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }
}
