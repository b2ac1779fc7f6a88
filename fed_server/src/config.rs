//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use federation::db::{DatabaseConfig, DatabaseConfigError};
use federation::tournament::SeedingPolicy;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

/// Where tournaments are stored
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StorageBackend {
    #[default]
    Postgres,
    /// Process-local storage, lost on restart
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(format!("Unknown storage backend '{other}'")),
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Postgres => f.write_str("postgres"),
            Self::Memory => f.write_str("memory"),
        }
    }
}

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    pub storage: StorageBackend,
    /// Database configuration, present for the Postgres backend
    pub database: Option<DatabaseConfig>,
    /// Create missing tables on startup
    pub apply_schema: bool,
    /// Prometheus exporter address; metrics are disabled when unset
    pub metrics_bind: Option<SocketAddr>,
    /// Hex SHA-256 of the organizer bearer token. When set, every mutating
    /// route requires the token.
    pub organizer_token_sha256: Option<String>,
    /// Policy used when a bracket request does not name one
    pub default_seeding_policy: SeedingPolicy,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `database_url_override` - Optional database URL override (from CLI args)
    /// * `memory` - Force the in-memory backend (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if required variables are missing or invalid
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
        memory: bool,
    ) -> Result<Self, ConfigError> {
        let bind = match bind_override {
            Some(bind) => bind,
            None => parse_env("SERVER_BIND")?.unwrap_or(default_bind()),
        };

        let storage = if memory {
            StorageBackend::Memory
        } else {
            parse_env("STORAGE_BACKEND")?.unwrap_or_default()
        };

        let database = match storage {
            StorageBackend::Memory => None,
            StorageBackend::Postgres => {
                let database_url = database_url_override
                    .or_else(|| std::env::var("DATABASE_URL").ok())
                    .ok_or_else(|| ConfigError::MissingRequired {
                        var: "DATABASE_URL".to_string(),
                        hint: "Pass --db-url, or use --memory for a throwaway server".to_string(),
                    })?;
                Some(DatabaseConfig::from_env_with_url(database_url)?)
            }
        };

        let organizer_token_sha256 = std::env::var("ORGANIZER_TOKEN_SHA256")
            .ok()
            .map(|hash| hash.trim().to_ascii_lowercase())
            .filter(|hash| !hash.is_empty());

        Ok(ServerConfig {
            bind,
            storage,
            database,
            apply_schema: parse_env("APPLY_SCHEMA")?.unwrap_or(false),
            metrics_bind: parse_env("METRICS_BIND")?,
            organizer_token_sha256,
            default_seeding_policy: parse_env("DEFAULT_SEEDING_POLICY")?.unwrap_or_default(),
        })
    }

    /// Configuration for a local in-memory server with no organizer token
    pub fn in_memory() -> Self {
        Self {
            bind: default_bind(),
            storage: StorageBackend::Memory,
            database: None,
            apply_schema: false,
            metrics_bind: None,
            organizer_token_sha256: None,
            default_seeding_policy: SeedingPolicy::default(),
        }
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage == StorageBackend::Postgres && self.database.is_none() {
            return Err(ConfigError::MissingRequired {
                var: "DATABASE_URL".to_string(),
                hint: "The postgres backend needs a connection string".to_string(),
            });
        }

        if let Some(database) = &self.database {
            if database.min_connections > database.max_connections {
                return Err(ConfigError::Invalid {
                    var: "DB_MIN_CONNECTIONS".to_string(),
                    reason: format!(
                        "Cannot exceed DB_MAX_CONNECTIONS ({})",
                        database.max_connections
                    ),
                });
            }
        }

        if self.metrics_bind == Some(self.bind) {
            return Err(ConfigError::Invalid {
                var: "METRICS_BIND".to_string(),
                reason: format!("Must differ from the server address ({})", self.bind),
            });
        }

        if let Some(hash) = &self.organizer_token_sha256 {
            let is_sha256 = hex::decode(hash).is_ok_and(|bytes| bytes.len() == 32);
            if !is_sha256 {
                return Err(ConfigError::Invalid {
                    var: "ORGANIZER_TOKEN_SHA256".to_string(),
                    reason: "Must be 64 hex characters (echo -n token | sha256sum)".to_string(),
                });
            }
        }

        Ok(())
    }
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 6969))
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },

    #[error(transparent)]
    Database(#[from] DatabaseConfigError),
}

/// Parse an optional environment variable, rejecting values that do not parse
fn parse_env<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::Invalid {
                var: key.to_string(),
                reason: format!("'{value}': {e}"),
            }),
        Err(_) => Ok(None),
    }
}
