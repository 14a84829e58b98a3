//! Database operations for the `user_ad_revenue` table.
//!
//! Rows are partitioned logically by `(report_date, package_name, platform)`:
//! one load of one app's report for one day owns exactly one partition, and
//! re-loads always act on whole partitions.

use adrev_core::{Platform, UserLevelRecord};
use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, Transaction};

use crate::{DbError, PartitionSwap};

/// Returns whether any rows exist for the `(report_date, package_name, platform)`
/// partition.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn user_partition_exists(
    pool: &PgPool,
    report_date: NaiveDate,
    package_name: &str,
    platform: Platform,
) -> Result<bool, DbError> {
    let exists: bool = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS ( \
             SELECT 1 FROM user_ad_revenue \
             WHERE report_date = $1 AND package_name = $2 AND platform = $3 \
         )",
    )
    .bind(report_date)
    .bind(package_name)
    .bind(platform.as_str())
    .fetch_one(pool)
    .await?;

    Ok(exists)
}

/// Inserts a batch of user-level rows inside a single transaction.
///
/// Returns the number of rows written. An empty batch is a no-op returning
/// zero.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any insert fails; the transaction rolls back
/// and no rows from the batch are kept.
pub async fn insert_user_records(
    pool: &PgPool,
    records: &[UserLevelRecord],
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

/// Atomically replaces the `(report_date, package_name, platform)` partition.
///
/// Deletes every existing row of the partition and inserts the new batch in
/// the same transaction, so readers never observe a half-swapped partition
/// and a failed load keeps the previous rows intact.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete or any insert fails.
pub async fn replace_user_partition(
    pool: &PgPool,
    report_date: NaiveDate,
    package_name: &str,
    platform: Platform,
    records: &[UserLevelRecord],
) -> Result<PartitionSwap, DbError> {
    let mut tx = pool.begin().await?;

    let deleted = sqlx::query(
        "DELETE FROM user_ad_revenue \
         WHERE report_date = $1 AND package_name = $2 AND platform = $3",
    )
    .bind(report_date)
    .bind(package_name)
    .bind(platform.as_str())
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
    record: &UserLevelRecord,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO user_ad_revenue \
             (report_date, application, package_name, platform, impression_timestamp, \
              ad_unit_id, ad_unit_name, waterfall, ad_format, placement, ad_placement, \
              network, country, device_type, idfa, idfv, user_id, custom_data, \
              revenue, impressions, data_source, data_type, extra_columns, loaded_at) \
         VALUES ($1, $2, $3, $4, $5, \
                 $6, $7, $8, $9, $10, $11, \
                 $12, $13, $14, $15, $16, $17, $18, \
                 $19, $20, $21, $22, $23::jsonb, $24)",
    )
    .bind(record.report_date)
    .bind(&record.application)
    .bind(&record.package_name)
    .bind(record.platform.as_str())
    .bind(record.impression_timestamp)
    .bind(&record.ad_unit_id)
    .bind(&record.ad_unit_name)
    .bind(&record.waterfall)
    .bind(&record.ad_format)
    .bind(&record.placement)
    .bind(&record.ad_placement)
    .bind(&record.network)
    .bind(&record.country)
    .bind(&record.device_type)
    .bind(&record.idfa)
    .bind(&record.idfv)
    .bind(&record.user_id)
    .bind(&record.custom_data)
    .bind(record.revenue)
    .bind(record.kind.impressions())
    .bind(record.data_source.as_str())
    .bind(record.kind.data_type())
    .bind((!record.extra.is_empty()).then(|| sqlx::types::Json(&record.extra)))
    .bind(record.loaded_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}
