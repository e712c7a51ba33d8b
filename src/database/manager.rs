use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::config::AppConfig;

/// Errors from the database layer
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Builds the shared MySQL connection pool.
///
/// Every request competes for the same bounded set of connections; once the
/// pool is exhausted callers wait up to the connect timeout and then fail.
pub struct DatabaseManager;

impl DatabaseManager {
    fn pool_options(config: &AppConfig) -> MySqlPoolOptions {
        MySqlPoolOptions::new()
            .max_connections(config.database.connection_limit)
            .acquire_timeout(Duration::from_secs(config.database.connect_timeout_secs))
    }

    /// Connect eagerly, failing if the server is unreachable
    pub async fn connect(config: &AppConfig) -> Result<MySqlPool, DatabaseError> {
        let url = config.database_url().map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        let pool = Self::pool_options(config).connect(&url).await?;
        info!(
            host = %config.database.host,
            database = %config.database.name,
            max_connections = config.database.connection_limit,
            "Created database pool"
        );
        Ok(pool)
    }

    /// Build a pool that opens connections on first use
    pub fn connect_lazy(config: &AppConfig) -> Result<MySqlPool, DatabaseError> {
        let url = config.database_url().map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        Ok(Self::pool_options(config).connect_lazy(&url)?)
    }

    /// Pings the pool to ensure connectivity
    pub async fn health_check(pool: &MySqlPool) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(pool).await?;
        Ok(())
    }

    /// Apply the canonical schema from `migrations/`
    pub async fn run_migrations(pool: &MySqlPool) -> Result<(), DatabaseError> {
        sqlx::migrate!("./migrations").run(pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    /// Quote SQL identifier to prevent injection
    pub fn quote_identifier(name: &str) -> String {
        format!("`{}`", name.replace('`', "``"))
    }
}
