//! Configuration loading and layering
//!
//! The connection target is resolved from, lowest precedence first:
//! built-in defaults, a TOML file, the environment, and CLI flags.
//! A layer that supplies `url` replaces the endpoint described by the
//! layers beneath it; individual fields then refine that URL.

use crate::descriptor::{ConnectionDescriptor, DescriptorError, DescriptorParts};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Config file read from the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "pgprobe.toml";

/// Password variable consulted when nothing else supplies one
pub const PGPASSWORD_ENV: &str = "PGPASSWORD";

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error occurred while reading config file
    #[error("cannot read config file {path}: {source}")]
    Io {
        /// File that could not be read
        path: PathBuf,
        /// Underlying IO error
        source: std::io::Error,
    },

    /// TOML parsing error occurred
    #[error("TOML parsing error in {path}: {source}")]
    Toml {
        /// File that failed to parse
        path: PathBuf,
        /// Parser error
        source: toml::de::Error,
    },

    /// An environment variable held an unusable value
    #[error("invalid value for {name}: {value}")]
    InvalidEnv {
        /// Variable name
        name: &'static str,
        /// Offending value
        value: String,
    },

    /// The resolved fields do not form a valid descriptor
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
}

/// Main configuration structure for pgprobe
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Database connection configuration
    #[serde(default)]
    pub database: DatabaseConfig,
}

/// Database connection configuration
///
/// Every field is optional so that the same shape serves as a file section,
/// an environment snapshot and a set of CLI overrides.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// Full connection URL
    pub url: Option<String>,
    /// Database host
    pub host: Option<String>,
    /// Database port
    pub port: Option<u16>,
    /// Database user
    pub user: Option<String>,
    /// Environment variable containing the password
    pub password_env: Option<String>,
    /// Database name
    pub database: Option<String>,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load the explicit config file, or `pgprobe.toml` if it exists
    ///
    /// An explicit path must exist; the implicit one is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            debug!("Loading configuration from {}", path.display());
            return Self::from_file(path);
        }

        let default_path = Path::new(DEFAULT_CONFIG_FILE);
        if default_path.exists() {
            debug!("Loading configuration from {}", default_path.display());
            Self::from_file(default_path)
        } else {
            debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
            Ok(Self::default())
        }
    }
}

impl DatabaseConfig {
    /// Snapshot the `DATABASE_URL` / `PG*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`DatabaseConfig::from_env`] with an injectable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // libpq treats an empty variable as unset
        let lookup = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let port = match lookup("PGPORT") {
            Some(value) => Some(value.trim().parse::<u16>().map_err(|_| {
                ConfigError::InvalidEnv {
                    name: "PGPORT",
                    value,
                }
            })?),
            None => None,
        };

        Ok(Self {
            url: lookup("DATABASE_URL"),
            host: lookup("PGHOST"),
            port,
            user: lookup("PGUSER"),
            password_env: None,
            database: lookup("PGDATABASE"),
        })
    }

    /// Layer `self` over `lower`; fields set here win
    ///
    /// When `self` carries a URL, the endpoint fields of `lower` are dropped
    /// so that they cannot leak into the URL's target.
    #[must_use]
    pub fn layered_over(self, lower: Self) -> Self {
        let lower = if self.url.is_some() {
            Self {
                password_env: lower.password_env,
                ..Self::default()
            }
        } else {
            lower
        };

        Self {
            url: self.url.or(lower.url),
            host: self.host.or(lower.host),
            port: self.port.or(lower.port),
            user: self.user.or(lower.user),
            password_env: self.password_env.or(lower.password_env),
            database: self.database.or(lower.database),
        }
    }

    /// Resolve into a validated descriptor using the process environment
    pub fn resolve(&self) -> Result<ConnectionDescriptor, ConfigError> {
        self.resolve_with(|name| env::var(name).ok())
    }

    /// Resolve into a validated descriptor with an injectable env lookup
    pub fn resolve_with<F>(&self, lookup: F) -> Result<ConnectionDescriptor, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base = match &self.url {
            Some(url) => DescriptorParts::from_url(url)?,
            None => DescriptorParts::default(),
        };

        let fields = DescriptorParts {
            scheme: None,
            user: self.user.clone(),
            password: None,
            host: self.host.clone(),
            port: self.port,
            database: self.database.clone(),
        };

        let mut parts = base.overlay(fields);
        if parts.password.is_none() {
            parts.password = self.lookup_password(&lookup);
        }

        let descriptor = parts.build()?;
        debug!("Resolved connection target {}", descriptor);
        Ok(descriptor)
    }

    fn lookup_password<F>(&self, lookup: &F) -> Option<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(password_env) = &self.password_env {
            debug!(
                "Reading password from environment variable: {}",
                password_env
            );
            match lookup(password_env) {
                Some(password) => return Some(password),
                None => warn!("Environment variable {} not found", password_env),
            }
        }
        lookup(PGPASSWORD_ENV)
    }
}
