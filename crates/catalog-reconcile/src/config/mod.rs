//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::error::{ReconcileError, Result};
use std::path::Path;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Build configuration from the process environment.
    ///
    /// Reads `MYSQL_HOST`, `MYSQL_PORT`, `MYSQL_USER`, `MYSQL_PASSWORD`,
    /// `MYSQL_DB`, `MONGODB_URL` and `MONGODB_DATABASE`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ReconcileError::Config(format!("{} is not set", name)))
        };

        let port = match lookup("MYSQL_PORT").filter(|v| !v.is_empty()) {
            Some(raw) => raw.parse::<u16>().map_err(|_| {
                ReconcileError::Config(format!("MYSQL_PORT must be a port number, got '{}'", raw))
            })?,
            None => 3306,
        };

        let config = Config {
            relational: RelationalConfig {
                host: required("MYSQL_HOST")?,
                port,
                database: required("MYSQL_DB")?,
                user: required("MYSQL_USER")?,
                password: lookup("MYSQL_PASSWORD").unwrap_or_default(),
            },
            document: DocumentConfig {
                url: required("MONGODB_URL")?,
                database: lookup("MONGODB_DATABASE")
                    .filter(|v| !v.is_empty())
                    .unwrap_or_else(|| "search".to_string()),
                id_type: DocumentKeyType::default(),
            },
            reconcile: ReconcileConfig::default(),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}
