//! Database operations for the `aggregate_ad_revenue` table.
//!
//! Both aggregate report variants land here and are gated independently, so
//! the partition key is `(report_date, query_type)`. Dimension columns hold
//! whatever the account-wide report returned; unlike user-level rows they are
//! not tied to the configured application registry.

use adrev_core::{AggregateMetrics, AggregateRecord, QueryType};
use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, Transaction};

use crate::{DbError, PartitionSwap};

/// Returns whether any rows exist for the `(report_date, query_type)` partition.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn aggregate_partition_exists(
    pool: &PgPool,
    report_date: NaiveDate,
    query_type: QueryType,
) -> Result<bool, DbError> {
    let exists: bool = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS ( \
             SELECT 1 FROM aggregate_ad_revenue \
             WHERE report_date = $1 AND query_type = $2 \
         )",
    )
    .bind(report_date)
    .bind(query_type.as_str())
    .fetch_one(pool)
    .await?;

    Ok(exists)
}

/// Inserts a batch of aggregate rows inside a single transaction.
///
/// Returns the number of rows written. An empty batch is a no-op returning
/// zero.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any insert fails; the transaction rolls back
/// and no rows from the batch are kept.
pub async fn insert_aggregate_records(
    pool: &PgPool,
    records: &[AggregateRecord],
) -> Result<u64, DbError> {
    if records.is_empty() {
        return Ok(0);
    }

    let mut tx = pool.begin().await?;
    for record in records {
        insert_record(&mut tx, record).await?;
    }
    tx.commit().await?;

    Ok(records.len() as u64)
}

/// Atomically replaces the `(report_date, query_type)` partition.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete or any insert fails; the
/// transaction rolls back and the previous rows are kept.
pub async fn replace_aggregate_partition(
    pool: &PgPool,
    report_date: NaiveDate,
    query_type: QueryType,
    records: &[AggregateRecord],
) -> Result<PartitionSwap, DbError> {
    let mut tx = pool.begin().await?;

    let deleted = sqlx::query(
        "DELETE FROM aggregate_ad_revenue \
         WHERE report_date = $1 AND query_type = $2",
    )
    .bind(report_date)
    .bind(query_type.as_str())
    .execute(&mut *tx)
    .await?
    .rows_affected();

    for record in records {
        insert_record(&mut tx, record).await?;
    }

    tx.commit().await?;

    Ok(PartitionSwap {
        deleted,
        inserted: records.len() as u64,
    })
}

async fn insert_record(
    tx: &mut Transaction<'_, Postgres>,
    record: &AggregateRecord,
) -> Result<(), sqlx::Error> {
    // Variant metrics spread across nullable columns; the unused variant's
    // columns stay NULL.
    let (requests, attempts, responses, fill_rate) = match record.metrics {
        AggregateMetrics::Basic { requests } => (Some(requests), None, None, None),
        AggregateMetrics::Network {
            attempts,
            responses,
            fill_rate,
        } => (None, Some(attempts), Some(responses), Some(fill_rate)),
    };

    sqlx::query(
        "INSERT INTO aggregate_ad_revenue \
             (report_date, application, package_name, platform, country, device_type, \
              ad_format, ad_unit_id, placement, network, network_placement, \
              impressions, estimated_revenue, ecpm, \
              requests, attempts, responses, fill_rate, query_type, loaded_at) \
         VALUES ($1, $2, $3, $4, $5, $6, \
                 $7, $8, $9, $10, $11, \
                 $12, $13, $14, \
                 $15, $16, $17, $18, $19, $20)",
    )
    .bind(record.report_date)
    .bind(&record.application)
    .bind(&record.package_name)
    .bind(&record.platform)
    .bind(&record.country)
    .bind(&record.device_type)
    .bind(&record.ad_format)
    .bind(&record.ad_unit_id)
    .bind(&record.placement)
    .bind(&record.network)
    .bind(&record.network_placement)
    .bind(record.impressions)
    .bind(record.estimated_revenue)
    .bind(record.ecpm)
    .bind(requests)
    .bind(attempts)
    .bind(responses)
    .bind(fill_rate)
    .bind(record.metrics.query_type().as_str())
    .bind(record.loaded_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}
