//! Application configuration management.
//!
//! Settings are layered with figment, later layers winning:
//!
//! 1. Built-in defaults
//! 2. TOML file (`--config PATH`, else `config.toml` in the platform config
//!    directory if it exists)
//! 3. Environment variables prefixed with `VAULT_REVEALER_`
//!    (e.g. `VAULT_REVEALER_POLL_INTERVAL_MS=250`)
//! 4. Command-line flags, applied with [`Config::merge_cli`]
//!
//! Configuration is read-only; nothing is ever written back.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::actions::disable::SIDECAR_SUFFIX;

/// Prefix of environment variables read into the configuration.
pub const ENV_PREFIX: &str = "VAULT_REVEALER_";

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested config file does not exist.
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    /// A layer could not be parsed or had the wrong shape.
    #[error("invalid configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    /// A setting has an unusable value.
    #[error("invalid value for {field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Suffix appended to a file's name to disable it.
    pub sidecar_suffix: String,
    /// How often the foreground polls a running task, in milliseconds.
    pub poll_interval_ms: u64,
    /// Plain ASCII progress output without animation.
    pub accessible: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sidecar_suffix: SIDECAR_SUFFIX.to_string(),
            poll_interval_ms: 100,
            accessible: false,
        }
    }
}

impl Config {
    /// Load configuration from defaults, the config file and the environment.
    ///
    /// With `path`, that file must exist. Without it, the platform default
    /// file is used if present.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit file is missing, a layer fails to
    /// parse, or the result does not pass [`validate`](Self::validate).
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(p) if !p.is_file() => return Err(ConfigError::NotFound(p.to_path_buf())),
            Some(p) => Some(p.to_path_buf()),
            None => default_config_path().filter(|p| p.is_file()),
        };

        if let Some(ref f) = file {
            log::debug!("Loading config from {}", f.display());
        }

        let config: Self = Self::figment(file.as_deref())
            .extract()
            .map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    /// The layered figment, without CLI overrides.
    #[must_use]
    pub fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(file) = file {
            figment = figment.merge(Toml::file(file));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Apply command-line overrides.
    pub fn merge_cli(&mut self, suffix: Option<&str>, accessible: bool) {
        if let Some(suffix) = suffix {
            self.sidecar_suffix = suffix.to_string();
        }
        if accessible {
            self.accessible = true;
        }
    }

    /// Check that every setting is usable.
    ///
    /// # Errors
    ///
    /// Rejects an empty suffix, a suffix containing a path separator, and a
    /// zero poll interval.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sidecar_suffix.is_empty() {
            return Err(ConfigError::Invalid {
                field: "sidecar_suffix",
                message: "must not be empty".to_string(),
            });
        }
        if self.sidecar_suffix.chars().any(std::path::is_separator) {
            return Err(ConfigError::Invalid {
                field: "sidecar_suffix",
                message: format!(
                    "'{}' must not contain a path separator",
                    self.sidecar_suffix
                ),
            });
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "poll_interval_ms",
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// The poll interval as a [`Duration`].
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Platform-specific path of the default config file.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("org", "vault-revealer", "vault-revealer")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}
