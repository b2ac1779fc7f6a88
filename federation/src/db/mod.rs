//! Database module providing PostgreSQL connection pooling and tournament storage.
//!
//! This module manages the database connection pool using sqlx, ships the
//! schema, and provides the repository implementations used by the manager.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

use crate::tournament::{TournamentError, TournamentResult};
use timeouts::{LONG_OPERATION_TIMEOUT, with_timeout};

pub mod config;
pub mod memory;
pub mod repository;
pub mod timeouts;

pub use config::{DatabaseConfig, DatabaseConfigError};
pub use memory::MemoryTournamentRepository;
pub use repository::{PgTournamentRepository, TournamentRepository};

/// Tables and indexes, every statement idempotent
pub const SCHEMA: &str = include_str!("schema.sql");

/// Database connection pool wrapper
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use federation::db::{Database, DatabaseConfig};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let config = DatabaseConfig::from_env()?;
    ///     let db = Database::new(&config).await?;
    ///     db.apply_schema().await?;
    ///     Ok(())
    /// }
    /// ```
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .connect(&config.database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create missing tables and indexes
    pub async fn apply_schema(&self) -> TournamentResult<()> {
        with_timeout(LONG_OPERATION_TIMEOUT, async {
            sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
            Ok::<_, TournamentError>(())
        })
        .await
    }

    /// Close the database connection pool
    pub async fn close(self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_is_idempotent() {
        let creates = SCHEMA
            .lines()
            .filter(|line| line.trim_start().starts_with("CREATE"))
            .collect::<Vec<_>>();
        assert!(!creates.is_empty());
        assert!(creates.iter().all(|line| line.contains("IF NOT EXISTS")));
    }

    #[test]
    fn test_schema_declares_all_tables() {
        for table in ["tournaments", "tournament_participants", "matches"] {
            assert!(SCHEMA.contains(&format!("CREATE TABLE IF NOT EXISTS {table} (")));
        }
    }
}
