//! Configuration loading and validation.
//!
//! Values are layered: built-in defaults, then an optional YAML file, then
//! environment overrides. The target connection string is only ever read from
//! the environment.

mod types;
mod validation;

pub use types::*;

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::drivers::SslMode;
use crate::error::{MigrateError, Result};

/// Configuration file picked up from the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "edu-migrate.yaml";

/// Environment variables overriding file values.
pub const ENV_SOURCE_PATH: &str = "EDU_SOURCE_PATH";
pub const ENV_EXPORT_PATH: &str = "EDU_EXPORT_PATH";
pub const ENV_PROBE_URL: &str = "EDU_PROBE_URL";
pub const ENV_SSL_MODE: &str = "PGSSLMODE";

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            MigrateError::Config(format!("cannot read config file {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = if yaml.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Resolve the effective configuration.
    ///
    /// Uses `path` when given, else [`DEFAULT_CONFIG_FILE`] when it exists in
    /// the working directory, else the defaults. Environment overrides are
    /// applied last and the result is validated.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let base = match path {
            Some(p) => Self::load(p)?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                debug!("Using {}", DEFAULT_CONFIG_FILE);
                Self::load(DEFAULT_CONFIG_FILE)?
            }
            None => Self::default(),
        };

        let config = base.with_env_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides read through `lookup`. Empty values are ignored.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(ENV_SOURCE_PATH) {
            self.source.path = PathBuf::from(v);
        }
        if let Some(v) = get(ENV_EXPORT_PATH) {
            self.export.path = PathBuf::from(v);
        }
        if let Some(v) = get(ENV_PROBE_URL) {
            self.probe.base_url = v;
        }
        if let Some(v) = get(ENV_SSL_MODE) {
            self.target.ssl_mode = v;
        }
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}

impl TargetConfig {
    /// Read the target connection string from the environment.
    pub fn resolve_url(&self) -> Result<String> {
        self.resolve_url_with(|name| std::env::var(name).ok())
    }

    pub fn resolve_url_with<F>(&self, lookup: F) -> Result<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        match lookup(&self.url_env) {
            Some(url) if !url.trim().is_empty() => Ok(url.trim().to_string()),
            _ => Err(MigrateError::Config(format!(
                "{} is not set; it must hold the target connection string",
                self.url_env
            ))),
        }
    }

    /// Parsed SSL mode.
    pub fn ssl(&self) -> Result<SslMode> {
        SslMode::parse(&self.ssl_mode)
    }
}
