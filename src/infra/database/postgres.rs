//! PostgreSQL connection pool, migrations and health check.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use sqlx::{PgPool, Postgres, Transaction, postgres::PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::{AppError, DatabaseError, HealthCheck, ValidationError};

/// PostgreSQL connection pool configuration
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 2,
            acquire_timeout: Duration::from_secs(3),
            idle_timeout: Duration::from_secs(600),
            max_lifetime: Duration::from_secs(1800),
        }
    }
}

/// PostgreSQL database client with connection pooling.
///
/// The repositories share its pool; see [`PostgresClient::pool`].
#[derive(Clone)]
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Create a new PostgreSQL client with custom configuration
    pub async fn new(database_url: &SecretString, config: PostgresConfig) -> Result<Self, AppError> {
        info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            "Connecting to PostgreSQL..."
        );
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(config.idle_timeout)
            .max_lifetime(config.max_lifetime)
            .connect(database_url.expose_secret())
            .await
            .map_err(|e| AppError::Database(DatabaseError::Connection(e.to_string())))?;
        info!("Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Wraps an existing pool.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run database migrations using sqlx migrate
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations completed successfully");
        Ok(())
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl HealthCheck for PostgresClient {
    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(DatabaseError::Connection(e.to_string())))?;
        Ok(())
    }
}

/// A stored value that no longer passes domain validation.
pub(crate) fn corrupt(table: &str, err: ValidationError) -> AppError {
    AppError::Database(DatabaseError::CorruptRow(format!("{table}: {err}")))
}

/// Explains a versioned `UPDATE ... WHERE id = $1 AND version = $n` that
/// touched no row: either the row is gone or another writer saved it first.
pub(crate) async fn missed_update(
    tx: &mut Transaction<'_, Postgres>,
    table: &'static str,
    entity: &str,
    id: Uuid,
    expected_version: i64,
) -> AppError {
    let exists = sqlx::query_scalar::<_, bool>(&format!(
        "SELECT EXISTS (SELECT 1 FROM {table} WHERE id = $1)"
    ))
    .bind(id)
    .fetch_one(&mut **tx)
    .await;

    match exists {
        Ok(true) => AppError::Database(DatabaseError::StaleWrite(format!(
            "{entity} {id} is no longer at version {expected_version}"
        ))),
        Ok(false) => AppError::Database(DatabaseError::NotFound(format!(
            "{entity} {id} not found"
        ))),
        Err(e) => e.into(),
    }
}

/// Converts a count or limit read from the database into the domain's
/// unsigned representation.
pub(crate) fn non_negative(table: &str, column: &str, value: i32) -> Result<u32, AppError> {
    u32::try_from(value).map_err(|_| {
        AppError::Database(DatabaseError::CorruptRow(format!(
            "{table}.{column} is negative ({value})"
        )))
    })
}

/// Domain counts are bounded well below `i32::MAX`.
pub(crate) fn db_int(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

/// Page bounds as the `i64` values Postgres expects for LIMIT/OFFSET.
pub(crate) fn limit_offset(page: crate::domain::PageRequest) -> (i64, i64) {
    let limit = i64::from(page.page_size());
    let offset = i64::try_from(page.offset()).unwrap_or(i64::MAX);
    (limit, offset)
}

/// Escapes LIKE wildcards in a search term and wraps it in `%`.
pub(crate) fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PageRequest;

    #[test]
    fn test_default_pool_config() {
        let config = PostgresConfig::default();
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
        assert_eq!(config.acquire_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("ada"), "%ada%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn test_limit_offset() {
        let page = PageRequest::new(Some(3), Some(20)).unwrap();
        assert_eq!(limit_offset(page), (20, 40));
    }

    #[test]
    fn test_non_negative() {
        assert_eq!(non_negative("courses", "max_enrollment", 30).unwrap(), 30);
        assert!(non_negative("courses", "max_enrollment", -1).is_err());
    }
}
