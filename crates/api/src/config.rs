//! Application configuration loaded from environment variables.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use infra::{DEFAULT_TOPIC, LocalStorage};
use thiserror::Error;

/// Secret used when `JWT_SECRET` is unset. Only suitable for development.
pub const DEFAULT_JWT_SECRET: &str = "marketplace-development-secret";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} has invalid value {value:?}")]
    Invalid { var: &'static str, value: String },

    #[error("{var} is required when {reason}")]
    Missing {
        var: &'static str,
        reason: &'static str,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(()),
        }
    }
}

/// Where receipt uploads are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StorageBackend {
    #[default]
    Local,
    Gcs,
}

impl FromStr for StorageBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "gcs" => Ok(Self::Gcs),
            _ => Err(()),
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`, `PORT`: bind address (default `0.0.0.0:3000`)
/// - `RUST_LOG`: tracing filter directive (default `info`)
/// - `LOG_FORMAT`: `pretty` or `json`
/// - `DATABASE_URL`: PostgreSQL connection string; unset runs in memory
/// - `JWT_SECRET`: HS256 secret for request tokens
/// - `STORAGE_BACKEND`: `local` or `gcs`, with `STORAGE_LOCAL_ROOT` or
///   `GCS_BUCKET` / `GCS_ACCESS_TOKEN`
/// - `PUBSUB_PROJECT_ID`, `PUBSUB_TOPIC`, `PUBSUB_ACCESS_TOKEN`: push
///   notifications; unset project disables publishing
/// - `REQUEST_TIMEOUT_SECS`: per-request deadline (default 30)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub storage_backend: StorageBackend,
    pub storage_local_root: PathBuf,
    pub gcs_bucket: Option<String>,
    pub gcs_access_token: Option<String>,
    pub pubsub_project_id: Option<String>,
    pub pubsub_topic: String,
    pub pubsub_access_token: Option<String>,
    pub request_timeout: Duration,
}

impl Config {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Loads configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let config = Self {
            host: get("HOST").unwrap_or(defaults.host),
            port: parse(&get, "PORT")?.unwrap_or(defaults.port),
            log_level: get("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: parse(&get, "LOG_FORMAT")?.unwrap_or_default(),
            database_url: get("DATABASE_URL"),
            jwt_secret: get("JWT_SECRET").unwrap_or(defaults.jwt_secret),
            storage_backend: parse(&get, "STORAGE_BACKEND")?.unwrap_or_default(),
            storage_local_root: get("STORAGE_LOCAL_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_local_root),
            gcs_bucket: get("GCS_BUCKET"),
            gcs_access_token: get("GCS_ACCESS_TOKEN"),
            pubsub_project_id: get("PUBSUB_PROJECT_ID"),
            pubsub_topic: get("PUBSUB_TOPIC").unwrap_or(defaults.pubsub_topic),
            pubsub_access_token: get("PUBSUB_ACCESS_TOKEN"),
            request_timeout: match parse::<u64>(&get, "REQUEST_TIMEOUT_SECS")? {
                Some(0) => {
                    return Err(ConfigError::Invalid {
                        var: "REQUEST_TIMEOUT_SECS",
                        value: "0".to_string(),
                    });
                }
                Some(secs) => Duration::from_secs(secs),
                None => defaults.request_timeout,
            },
        };

        if config.storage_backend == StorageBackend::Gcs && config.gcs_bucket.is_none() {
            return Err(ConfigError::Missing {
                var: "GCS_BUCKET",
                reason: "STORAGE_BACKEND is gcs",
            });
        }

        Ok(config)
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn uses_default_secret(&self) -> bool {
        self.jwt_secret == DEFAULT_JWT_SECRET
    }
}

fn parse<T: FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError> {
    get(var)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid { var, value })
        })
        .transpose()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            database_url: None,
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            storage_backend: StorageBackend::Local,
            storage_local_root: PathBuf::from(LocalStorage::DEFAULT_ROOT),
            gcs_bucket: None,
            gcs_access_token: None,
            pubsub_project_id: None,
            pubsub_topic: DEFAULT_TOPIC.to_string(),
            pubsub_access_token: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}
