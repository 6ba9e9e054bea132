//! Boot configuration
//!
//! Sources are merged in this order (later sources override earlier):
//! 1. defaults from `BootConfig::default()`
//! 2. a TOML file (if given and present)
//! 3. `COMPOSER_`-prefixed environment variables, `__` separating nested
//!    keys (e.g. `COMPOSER_LOG__LEVEL=debug`)
//!
//! The result is read once at startup and never reloaded.

use crate::logging::LogSettings;
use crate::{DiError, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const ENV_PREFIX: &str = "COMPOSER_";

/// Settings consumed while composing the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootConfig {
    /// Opens the activation gate for the pro module batch
    pub pro_enabled: bool,
    /// Running from a bundled artifact; detected when absent
    pub is_packaged: Option<bool>,
    /// Identifiers to construct at boot, by name (`HTTPServer`) or display
    /// form (`Symbol(HTTPServer)`)
    pub eager: Vec<String>,
    /// Locale initialised in the string-resolution service
    pub locale: String,
    /// Directory of `<locale>.json` translation bundles
    pub translations_dir: Option<PathBuf>,
    pub log: LogSettings,
}

impl Default for BootConfig {
    fn default() -> Self {
        Self {
            pro_enabled: false,
            is_packaged: None,
            eager: Vec::new(),
            locale: "en".to_owned(),
            translations_dir: None,
            log: LogSettings::default(),
        }
    }
}

impl BootConfig {
    /// Packaging flag, falling back to detection.
    ///
    /// A binary launched through cargo sees the `CARGO` variable and is
    /// treated as running from source.
    pub fn is_packaged(&self) -> bool {
        self.is_packaged
            .unwrap_or_else(|| std::env::var_os("CARGO").is_none())
    }
}

/// Loads [`BootConfig`] through figment.
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    pub fn figment(&self) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(BootConfig::default()));

        if let Some(path) = &self.config_path {
            if path.exists() {
                debug!(target: "service_composer", path = %path.display(), "Loading configuration file");
                figment = figment.merge(Toml::file(path));
            } else {
                warn!(target: "service_composer", path = %path.display(), "Configuration file not found, using defaults");
            }
        }

        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn load(&self) -> Result<BootConfig> {
        self.figment()
            .extract()
            .map_err(|e| DiError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogFormat;
    use figment::Jail;

    #[test]
    fn test_defaults() {
        Jail::expect_with(|_| {
            let config = ConfigLoader::new().load().map_err(|e| e.to_string())?;
            assert_eq!(config, BootConfig::default());
            assert_eq!(config.locale, "en");
            assert!(!config.pro_enabled);
            Ok(())
        });
    }

    #[test]
    fn test_toml_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "composer.toml",
                r#"
                    pro_enabled = true
                    is_packaged = true
                    eager = ["HTTPServer", "Symbol(MigrationService)"]
                    locale = "fr"

                    [log]
                    level = "debug"
                    format = "compact"
                "#,
            )?;

            let config = ConfigLoader::new()
                .with_config_path("composer.toml")
                .load()
                .map_err(|e| e.to_string())?;

            assert!(config.pro_enabled);
            assert!(config.is_packaged());
            assert_eq!(config.eager, vec!["HTTPServer", "Symbol(MigrationService)"]);
            assert_eq!(config.locale, "fr");
            assert_eq!(config.log.level, "debug");
            assert_eq!(config.log.format, LogFormat::Compact);
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("composer.toml", "pro_enabled = true\nlocale = \"fr\"")?;
            jail.set_env("COMPOSER_PRO_ENABLED", "false");
            jail.set_env("COMPOSER_LOG__LEVEL", "warn");

            let config = ConfigLoader::new()
                .with_config_path("composer.toml")
                .load()
                .map_err(|e| e.to_string())?;

            assert!(!config.pro_enabled);
            assert_eq!(config.locale, "fr");
            assert_eq!(config.log.level, "warn");
            Ok(())
        });
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        Jail::expect_with(|_| {
            let config = ConfigLoader::new()
                .with_config_path("absent.toml")
                .load()
                .map_err(|e| e.to_string())?;
            assert_eq!(config, BootConfig::default());
            Ok(())
        });
    }

    #[test]
    fn test_invalid_value_is_config_error() {
        Jail::expect_with(|jail| {
            jail.create_file("composer.toml", "pro_enabled = \"sometimes\"")?;
            let err = ConfigLoader::new()
                .with_config_path("composer.toml")
                .load()
                .unwrap_err();
            assert!(matches!(err, DiError::Config(_)));
            Ok(())
        });
    }
}
