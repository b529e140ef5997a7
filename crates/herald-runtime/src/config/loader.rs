//! Configuration loader using figment.
//!
//! Sources, lowest priority first:
//!
//! 1. Built-in defaults
//! 2. Profile file (`herald.{profile}.toml`)
//! 3. Main file (`herald.toml`, falling back to `config.toml`)
//! 4. Environment variables (`HERALD_*`)
//! 5. Programmatic overrides passed to [`ConfigLoader::merge`]
//!
//! File formats depend on features: `toml-config` enables `.toml`,
//! `yaml-config` enables `.yaml`/`.yml`. The profile comes from
//! `HERALD_PROFILE` and defaults to `development`.
//!
//! Environment variables use `__` as the nesting separator:
//!
//! - `HERALD_LOGGING__LEVEL=debug` → `logging.level = "debug"`
//! - `HERALD_DISPATCH__SYNC_COMMANDS=false` → `dispatch.sync_commands = false`
//!
//! ```rust,ignore
//! let config = ConfigLoader::new()
//!     .profile("production")
//!     .search_path("/etc/herald")
//!     .load()?;
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(any(feature = "toml-config", feature = "yaml-config"))]
use figment::providers::Format;
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use figment::providers::{Env, Serialized};
use tracing::{debug, info, trace, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::HeraldConfig;

/// Prefix of configuration environment variables.
pub const ENV_PREFIX: &str = "HERALD_";

/// Environment variable selecting the profile.
pub const PROFILE_ENV: &str = "HERALD_PROFILE";

const DEFAULT_PROFILE: &str = "development";

/// Returns the profile named by `HERALD_PROFILE`, normalising short aliases.
pub fn profile_from_env() -> String {
    std::env::var(PROFILE_ENV)
        .map(|profile| normalize_profile(&profile))
        .unwrap_or_else(|_| DEFAULT_PROFILE.to_string())
}

fn normalize_profile(profile: &str) -> String {
    match profile.to_lowercase().as_str() {
        "prod" | "production" => "production".to_string(),
        "dev" | "development" => "development".to_string(),
        other => other.to_string(),
    }
}

/// File names searched in each directory, for the enabled formats.
fn base_names() -> Vec<&'static str> {
    #[allow(unused_mut)]
    let mut names = Vec::new();
    #[cfg(feature = "toml-config")]
    names.extend(["herald.toml", "config.toml"]);
    #[cfg(feature = "yaml-config")]
    names.extend(["herald.yaml", "herald.yml", "config.yaml", "config.yml"]);
    names
}

/// Layered configuration loader.
pub struct ConfigLoader {
    overrides: Figment,
    profile: String,
    search_paths: Vec<PathBuf>,
    config_file: Option<PathBuf>,
    load_env: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a loader reading the profile from the environment.
    pub fn new() -> Self {
        Self {
            overrides: Figment::new(),
            profile: profile_from_env(),
            search_paths: Vec::new(),
            config_file: None,
            load_env: true,
        }
    }

    /// Overrides the profile.
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.profile = normalize_profile(profile.as_ref());
        self
    }

    /// Adds a directory to search. Without any, the current directory and
    /// the user config directory (`~/.config/herald`) are searched.
    pub fn search_path(mut self, path: impl AsRef<Path>) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Loads exactly this file instead of searching; it must exist.
    pub fn file(mut self, path: impl AsRef<Path>) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Merges a configuration over every other source.
    pub fn merge(mut self, config: HeraldConfig) -> Self {
        self.overrides = self.overrides.merge(Serialized::defaults(config));
        self
    }

    /// Loads and returns the configuration.
    pub fn load(self) -> ConfigResult<HeraldConfig> {
        let profile = self.profile.clone();
        let config: HeraldConfig = self.figment()?.extract()?;

        debug!(
            profile = %profile,
            logging_level = %config.logging.level,
            sync_commands = config.dispatch.sync_commands,
            "Configuration loaded"
        );
        Ok(config)
    }

    fn figment(self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(HeraldConfig::default()));

        figment = match &self.config_file {
            Some(path) if path.exists() => {
                info!(path = %path.display(), "Loading configuration file");
                merge_file(figment, path)?
            }
            Some(path) => return Err(ConfigError::FileNotFound(path.clone())),
            None => self.search(figment),
        };

        if self.load_env {
            trace!(prefix = ENV_PREFIX, "Merging environment variables");
            figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        }

        Ok(figment.merge(self.overrides))
    }

    fn search_dirs(&self) -> Vec<PathBuf> {
        if !self.search_paths.is_empty() {
            return self.search_paths.clone();
        }
        std::env::current_dir()
            .ok()
            .into_iter()
            .chain(dirs::config_dir().map(|dir| dir.join("herald")))
            .collect()
    }

    /// Merges the profile and main file of the first directory holding one.
    fn search(&self, mut figment: Figment) -> Figment {
        for dir in self.search_dirs() {
            for name in base_names() {
                let Some((stem, ext)) = name.rsplit_once('.') else {
                    continue;
                };

                let profile_path = dir.join(format!("{stem}.{}.{ext}", self.profile));
                if profile_path.exists() {
                    debug!(path = %profile_path.display(), "Loading profile configuration");
                    figment = merge_file(figment.clone(), &profile_path).unwrap_or(figment);
                }

                let path = dir.join(name);
                if path.exists() {
                    info!(path = %path.display(), "Loading configuration file");
                    return merge_file(figment.clone(), &path).unwrap_or(figment);
                }
            }
        }

        warn!("No configuration file found, using defaults");
        figment
    }
}

/// Merges one file, choosing the provider by extension.
fn merge_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
    let ext = path.extension().and_then(|ext| ext.to_str()).unwrap_or_default();
    match ext {
        #[cfg(feature = "toml-config")]
        "toml" => Ok(figment.merge(Toml::file(path))),
        #[cfg(feature = "yaml-config")]
        "yaml" | "yml" => Ok(figment.merge(Yaml::file(path))),
        _ => Err(ConfigError::UnsupportedFormat(ext.to_string())),
    }
}

/// Loads configuration from the default locations.
pub fn load_config() -> ConfigResult<HeraldConfig> {
    ConfigLoader::new().load()
}

/// Loads configuration from one file, with environment overrides.
pub fn load_config_from_file(path: impl AsRef<Path>) -> ConfigResult<HeraldConfig> {
    ConfigLoader::new().file(path).load()
}

// =============================================================================
// Tests
// =============================================================================
