//! The load-or-skip gate that makes re-runs idempotent.
//!
//! Every load targets exactly one warehouse partition, named by an
//! [`IngestionKey`]. Before writing, the runner checks whether the partition
//! already holds rows and combines that with the operator's `force_update`
//! choice to pick between skipping, plain insertion, and atomic replacement.

use adrev_core::{Platform, QueryType};
use adrev_db::{aggregate_partition_exists, user_partition_exists, DbError};
use chrono::NaiveDate;
use sqlx::PgPool;

/// Names one warehouse partition a load may own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestionKey {
    /// One app's user-level rows for one day.
    UserLevel {
        report_date: NaiveDate,
        package_name: String,
        platform: Platform,
    },
    /// One aggregate variant's rows for one day.
    Aggregate {
        report_date: NaiveDate,
        query_type: QueryType,
    },
}

impl IngestionKey {
    /// Returns whether the partition already holds rows.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the existence check fails.
    pub async fn rows_exist(&self, pool: &PgPool) -> Result<bool, DbError> {
        match self {
            IngestionKey::UserLevel {
                report_date,
                package_name,
                platform,
            } => user_partition_exists(pool, *report_date, package_name, *platform).await,
            IngestionKey::Aggregate {
                report_date,
                query_type,
            } => aggregate_partition_exists(pool, *report_date, *query_type).await,
        }
    }
}

impl std::fmt::Display for IngestionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IngestionKey::UserLevel {
                report_date,
                package_name,
                platform,
            } => write!(f, "user_ad_revenue/{report_date}/{package_name}/{platform}"),
            IngestionKey::Aggregate {
                report_date,
                query_type,
            } => write!(f, "aggregate_ad_revenue/{report_date}/{query_type}"),
        }
    }
}

/// What to do with a fetched batch, given the partition's current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Rows already present and no force requested; leave them alone.
    Skip,
    /// Partition is empty; plain insert.
    Insert,
    /// Rows already present and force requested; swap them atomically.
    ReplaceThenInsert,
}

/// The gate truth table. A populated partition is only ever rewritten when
/// the operator explicitly forces it.
#[must_use]
pub fn decide(rows_exist: bool, force_update: bool) -> GateDecision {
    match (rows_exist, force_update) {
        (true, false) => GateDecision::Skip,
        (true, true) => GateDecision::ReplaceThenInsert,
        (false, _) => GateDecision::Insert,
    }
}

/// Checks the key's partition and applies [`decide`].
///
/// # Errors
///
/// Returns [`DbError`] if the existence check fails.
pub async fn decide_for_key(
    pool: &PgPool,
    key: &IngestionKey,
    force_update: bool,
) -> Result<GateDecision, DbError> {
    let rows_exist = key.rows_exist(pool).await?;
    Ok(decide(rows_exist, force_update))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_truth_table() {
        assert_eq!(decide(false, false), GateDecision::Insert);
        assert_eq!(decide(false, true), GateDecision::Insert);
        assert_eq!(decide(true, false), GateDecision::Skip);
        assert_eq!(decide(true, true), GateDecision::ReplaceThenInsert);
    }

    #[test]
    fn keys_render_partition_paths() {
        let user = IngestionKey::UserLevel {
            report_date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            package_name: "com.example.puzzle".to_string(),
            platform: Platform::Android,
        };
        assert_eq!(
            user.to_string(),
            "user_ad_revenue/2024-01-10/com.example.puzzle/android"
        );

        let aggregate = IngestionKey::Aggregate {
            report_date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            query_type: QueryType::Network,
        };
        assert_eq!(
            aggregate.to_string(),
            "aggregate_ad_revenue/2024-01-10/network"
        );
    }
}
