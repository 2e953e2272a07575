//! Configuration management for the server.

use crate::store::{select::MAX_PAGE_SIZE, DEFAULT_PAGE_SIZE};
use std::env;
use std::fmt;
use std::str::FromStr;

/// Which attribute store backs the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackend {
    #[default]
    Memory,
    Postgres,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            other => Err(ConfigError::InvalidBackend(other.to_string())),
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreBackend::Memory => write!(f, "memory"),
            StoreBackend::Postgres => write!(f, "postgres"),
        }
    }
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    pub store_backend: StoreBackend,
    /// PostgreSQL connection URL, required for the postgres backend
    pub database_url: Option<String>,
    /// Select page size when a query sets no limit
    pub page_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            store_backend: StoreBackend::Memory,
            database_url: None,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let host = lookup("HOST").unwrap_or(defaults.host);

        let port = match lookup("PORT") {
            Some(port) => port.parse().map_err(|_| ConfigError::InvalidPort)?,
            None => defaults.port,
        };

        let store_backend = match lookup("STORE_BACKEND") {
            Some(backend) => backend.parse()?,
            None => defaults.store_backend,
        };

        let database_url = lookup("DATABASE_URL");
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::MissingDatabaseUrl);
        }

        let page_size = match lookup("PAGE_SIZE") {
            Some(size) => size
                .parse()
                .ok()
                .filter(|n| (1..=MAX_PAGE_SIZE).contains(n))
                .ok_or(ConfigError::InvalidPageSize)?,
            None => defaults.page_size,
        };

        Ok(Self {
            host,
            port,
            store_backend,
            database_url,
            page_size,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("DATABASE_URL environment variable is required for the postgres store")]
    MissingDatabaseUrl,

    #[error("Invalid PORT value")]
    InvalidPort,

    #[error("Invalid STORE_BACKEND value: {0}")]
    InvalidBackend(String),

    #[error("PAGE_SIZE must be between 1 and 2500")]
    InvalidPageSize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert_eq!(config.page_size, 100);
    }

    #[test]
    fn postgres_requires_url() {
        assert!(matches!(
            load(&[("STORE_BACKEND", "postgres")]),
            Err(ConfigError::MissingDatabaseUrl)
        ));
        let config = load(&[
            ("STORE_BACKEND", "Postgres"),
            ("DATABASE_URL", "postgres://localhost/sdbsync"),
        ])
        .unwrap();
        assert_eq!(config.store_backend, StoreBackend::Postgres);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(load(&[("PORT", "http")]), Err(ConfigError::InvalidPort)));
        assert!(matches!(
            load(&[("STORE_BACKEND", "dynamo")]),
            Err(ConfigError::InvalidBackend(_))
        ));
        assert!(matches!(load(&[("PAGE_SIZE", "0")]), Err(ConfigError::InvalidPageSize)));
        assert!(matches!(load(&[("PAGE_SIZE", "2501")]), Err(ConfigError::InvalidPageSize)));
        assert_eq!(load(&[("PAGE_SIZE", "2500")]).unwrap().page_size, 2500);
    }
}
