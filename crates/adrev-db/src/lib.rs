use adrev_core::AppConfig;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use thiserror::Error;

// sqlx resolves the path relative to this crate's Cargo.toml, landing on the
// workspace-level migrations/ directory.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

/// Pool sizing, normally taken from [`AppConfig`]'s `ADREV_DB_*` settings.
#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 1,
            acquire_timeout_secs: 10,
        }
    }
}

impl PoolConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_connections: config.db_max_connections,
            min_connections: config.db_min_connections,
            acquire_timeout_secs: config.db_acquire_timeout_secs,
        }
    }

    /// Opens a Postgres pool sized by this config.
    ///
    /// # Errors
    ///
    /// Returns [`sqlx::Error`] when no connection can be established within
    /// the acquire timeout.
    pub async fn connect(self, database_url: &str) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .acquire_timeout(Duration::from_secs(self.acquire_timeout_secs))
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .connect(database_url)
            .await
    }
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Row counts from an atomic partition replacement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PartitionSwap {
    pub deleted: u64,
    pub inserted: u64,
}

/// Applies pending migrations and reports how many ran.
///
/// # Errors
///
/// Returns [`sqlx::migrate::MigrateError`] when a migration fails; earlier
/// migrations in the batch stay applied.
pub async fn run_migrations(pool: &PgPool) -> Result<usize, sqlx::migrate::MigrateError> {
    let before = applied_count(pool).await;
    MIGRATOR.run(pool).await?;
    let after = applied_count(pool).await;
    Ok(after.saturating_sub(before))
}

// The tracking table does not exist on a fresh database; absence counts as
// zero applied.
async fn applied_count(pool: &PgPool) -> usize {
    let applied: Option<i64> =
        sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success")
            .fetch_one(pool)
            .await
            .ok();
    applied.and_then(|n| usize::try_from(n).ok()).unwrap_or(0)
}

/// Verifies the warehouse is reachable by round-tripping a trivial query.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] when the pool cannot serve a connection.
pub async fn health_check(pool: &PgPool) -> Result<(), DbError> {
    sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(pool).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pool_sizing_matches_documented_defaults() {
        let config = PoolConfig::default();

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 1);
        assert_eq!(config.acquire_timeout_secs, 10);
    }
}

pub mod aggregate_revenue;
pub mod user_ad_revenue;

pub use aggregate_revenue::{
    aggregate_partition_exists, insert_aggregate_records, replace_aggregate_partition,
};
pub use user_ad_revenue::{insert_user_records, replace_user_partition, user_partition_exists};
