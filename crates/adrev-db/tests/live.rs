//! Live integration tests for adrev-db using `#[sqlx::test]`.
//!
//! The sqlx test harness provisions a fresh database per test and applies
//! every migration before the test body runs. `"../../migrations"` is
//! resolved from the crate root (`crates/adrev-db/`) up to the workspace
//! migration directory.

use adrev_core::{
    AggregateMetrics, AggregateRecord, DataSource, Platform, QueryType, UserDataKind,
    UserLevelRecord,
};
use adrev_db::{
    aggregate_partition_exists, insert_aggregate_records, insert_user_records,
    replace_aggregate_partition, replace_user_partition, user_partition_exists,
};
use chrono::{NaiveDate, Utc};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn day(year: i32, month: u32, dom: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, dom).expect("valid date")
}

fn user_record(date: NaiveDate, package: &str, platform: Platform) -> UserLevelRecord {
    UserLevelRecord {
        report_date: date,
        application: "Example App".to_string(),
        package_name: package.to_string(),
        platform,
        impression_timestamp: date.and_hms_opt(12, 30, 0),
        ad_unit_id: Some("unit-1".to_string()),
        ad_unit_name: Some("Banner Main".to_string()),
        waterfall: None,
        ad_format: Some("BANNER".to_string()),
        placement: None,
        ad_placement: None,
        network: Some("ADMOB_NETWORK".to_string()),
        country: Some("us".to_string()),
        device_type: Some("phone".to_string()),
        idfa: None,
        idfv: None,
        user_id: Some("user-1".to_string()),
        custom_data: None,
        revenue: 0.0025,
        kind: UserDataKind::Impression,
        data_source: DataSource::FullReportUrl,
        extra: serde_json::Map::new(),
        loaded_at: Utc::now(),
    }
}

fn aggregate_record(date: NaiveDate, metrics: AggregateMetrics) -> AggregateRecord {
    AggregateRecord {
        report_date: date,
        application: Some("Example App".to_string()),
        package_name: Some("com.example.app".to_string()),
        platform: Some("android".to_string()),
        country: Some("us".to_string()),
        device_type: Some("phone".to_string()),
        ad_format: Some("INTER".to_string()),
        ad_unit_id: Some("unit-9".to_string()),
        placement: None,
        network: Some("APPLOVIN_EXCHANGE".to_string()),
        network_placement: None,
        impressions: 1200,
        estimated_revenue: 3.5,
        ecpm: 2.92,
        metrics,
        loaded_at: Utc::now(),
    }
}

async fn count_user_rows(
    pool: &sqlx::PgPool,
    date: NaiveDate,
    package: &str,
    platform: Platform,
) -> i64 {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM user_ad_revenue \
         WHERE report_date = $1 AND package_name = $2 AND platform = $3",
    )
    .bind(date)
    .bind(package)
    .bind(platform.as_str())
    .fetch_one(pool)
    .await
    .expect("count_user_rows failed")
}

async fn count_aggregate_rows(pool: &sqlx::PgPool, date: NaiveDate, query_type: QueryType) -> i64 {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM aggregate_ad_revenue \
         WHERE report_date = $1 AND query_type = $2",
    )
    .bind(date)
    .bind(query_type.as_str())
    .fetch_one(pool)
    .await
    .expect("count_aggregate_rows failed")
}

// ---------------------------------------------------------------------------
// Section 1: user-level partitions
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn user_partition_empty_until_insert(pool: sqlx::PgPool) {
    let date = day(2024, 1, 10);

    let before = user_partition_exists(&pool, date, "com.example.puzzle", Platform::Android)
        .await
        .expect("exists check failed");
    assert!(!before);

    let inserted = insert_user_records(
        &pool,
        &[
            user_record(date, "com.example.puzzle", Platform::Android),
            user_record(date, "com.example.puzzle", Platform::Android),
        ],
    )
    .await
    .expect("insert failed");
    assert_eq!(inserted, 2);

    let after = user_partition_exists(&pool, date, "com.example.puzzle", Platform::Android)
        .await
        .expect("exists check failed");
    assert!(after);
    assert_eq!(
        count_user_rows(&pool, date, "com.example.puzzle", Platform::Android).await,
        2
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn insert_user_records_empty_batch_is_noop(pool: sqlx::PgPool) {
    let inserted = insert_user_records(&pool, &[])
        .await
        .expect("empty insert failed");
    assert_eq!(inserted, 0);

    let exists = user_partition_exists(&pool, day(2024, 1, 10), "com.example.puzzle", Platform::Ios)
        .await
        .expect("exists check failed");
    assert!(!exists);
}

#[sqlx::test(migrations = "../../migrations")]
async fn replace_user_partition_swaps_only_its_partition(pool: sqlx::PgPool) {
    let date = day(2024, 1, 10);

    insert_user_records(
        &pool,
        &[
            user_record(date, "com.example.puzzle", Platform::Android),
            user_record(date, "com.example.puzzle", Platform::Android),
            user_record(date, "com.example.other", Platform::Android),
        ],
    )
    .await
    .expect("seed insert failed");

    let swap = replace_user_partition(
        &pool,
        date,
        "com.example.puzzle",
        Platform::Android,
        &[
            user_record(date, "com.example.puzzle", Platform::Android),
            user_record(date, "com.example.puzzle", Platform::Android),
            user_record(date, "com.example.puzzle", Platform::Android),
        ],
    )
    .await
    .expect("replace failed");

    assert_eq!(swap.deleted, 2);
    assert_eq!(swap.inserted, 3);
    assert_eq!(
        count_user_rows(&pool, date, "com.example.puzzle", Platform::Android).await,
        3
    );
    // The sibling app's rows are untouched.
    assert_eq!(
        count_user_rows(&pool, date, "com.example.other", Platform::Android).await,
        1
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn user_partitions_scoped_by_platform(pool: sqlx::PgPool) {
    let date = day(2024, 1, 10);

    insert_user_records(
        &pool,
        &[user_record(date, "com.example.puzzle", Platform::Android)],
    )
    .await
    .expect("insert failed");

    let ios = user_partition_exists(&pool, date, "com.example.puzzle", Platform::Ios)
        .await
        .expect("exists check failed");
    assert!(!ios, "same package on another platform is a separate partition");
}

#[sqlx::test(migrations = "../../migrations")]
async fn extra_columns_roundtrip_as_jsonb(pool: sqlx::PgPool) {
    let date = day(2024, 3, 1);
    let mut record = user_record(date, "com.example.extra", Platform::Android);
    record
        .extra
        .insert("session_depth".to_string(), serde_json::json!("4"));

    insert_user_records(&pool, &[record])
        .await
        .expect("insert failed");

    let stored: serde_json::Value =
        sqlx::query_scalar("SELECT extra_columns FROM user_ad_revenue WHERE package_name = $1")
            .bind("com.example.extra")
            .fetch_one(&pool)
            .await
            .expect("select extra_columns failed");

    assert_eq!(stored, serde_json::json!({ "session_depth": "4" }));
}

#[sqlx::test(migrations = "../../migrations")]
async fn empty_extra_columns_stored_as_null(pool: sqlx::PgPool) {
    let date = day(2024, 3, 1);
    insert_user_records(
        &pool,
        &[user_record(date, "com.example.plain", Platform::Android)],
    )
    .await
    .expect("insert failed");

    let is_null: bool = sqlx::query_scalar(
        "SELECT extra_columns IS NULL FROM user_ad_revenue WHERE package_name = $1",
    )
    .bind("com.example.plain")
    .fetch_one(&pool)
    .await
    .expect("select failed");

    assert!(is_null);
}

// ---------------------------------------------------------------------------
// Section 2: aggregate partitions
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn aggregate_partitions_scoped_by_query_type(pool: sqlx::PgPool) {
    let date = day(2024, 1, 10);

    insert_aggregate_records(
        &pool,
        &[aggregate_record(
            date,
            AggregateMetrics::Basic { requests: 9_000 },
        )],
    )
    .await
    .expect("insert failed");

    let basic = aggregate_partition_exists(&pool, date, QueryType::Basic)
        .await
        .expect("exists check failed");
    let network = aggregate_partition_exists(&pool, date, QueryType::Network)
        .await
        .expect("exists check failed");

    assert!(basic);
    assert!(!network, "network variant is a separate partition");
}

#[sqlx::test(migrations = "../../migrations")]
async fn replace_aggregate_partition_leaves_other_variant_intact(pool: sqlx::PgPool) {
    let date = day(2024, 1, 10);

    insert_aggregate_records(
        &pool,
        &[
            aggregate_record(date, AggregateMetrics::Basic { requests: 9_000 }),
            aggregate_record(date, AggregateMetrics::Basic { requests: 4_500 }),
        ],
    )
    .await
    .expect("seed basic insert failed");
    insert_aggregate_records(
        &pool,
        &[aggregate_record(
            date,
            AggregateMetrics::Network {
                attempts: 10_000,
                responses: 8_000,
                fill_rate: 0.8,
            },
        )],
    )
    .await
    .expect("seed network insert failed");

    let swap = replace_aggregate_partition(
        &pool,
        date,
        QueryType::Basic,
        &[aggregate_record(
            date,
            AggregateMetrics::Basic { requests: 9_100 },
        )],
    )
    .await
    .expect("replace failed");

    assert_eq!(swap.deleted, 2);
    assert_eq!(swap.inserted, 1);
    assert_eq!(count_aggregate_rows(&pool, date, QueryType::Basic).await, 1);
    assert_eq!(count_aggregate_rows(&pool, date, QueryType::Network).await, 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn aggregate_metrics_spread_across_variant_columns(pool: sqlx::PgPool) {
    let date = day(2024, 1, 10);

    insert_aggregate_records(
        &pool,
        &[
            aggregate_record(date, AggregateMetrics::Basic { requests: 9_000 }),
            aggregate_record(
                date,
                AggregateMetrics::Network {
                    attempts: 10_000,
                    responses: 8_000,
                    fill_rate: 0.8,
                },
            ),
        ],
    )
    .await
    .expect("insert failed");

    let (requests, attempts): (Option<i64>, Option<i64>) = sqlx::query_as(
        "SELECT requests, attempts FROM aggregate_ad_revenue WHERE query_type = 'basic'",
    )
    .fetch_one(&pool)
    .await
    .expect("select basic row failed");
    assert_eq!(requests, Some(9_000));
    assert!(attempts.is_none(), "basic rows carry no network metrics");

    let (requests, attempts, responses, fill_rate): (
        Option<i64>,
        Option<i64>,
        Option<i64>,
        Option<f64>,
    ) = sqlx::query_as(
        "SELECT requests, attempts, responses, fill_rate \
         FROM aggregate_ad_revenue WHERE query_type = 'network'",
    )
    .fetch_one(&pool)
    .await
    .expect("select network row failed");
    assert!(requests.is_none(), "network rows carry no request count");
    assert_eq!(attempts, Some(10_000));
    assert_eq!(responses, Some(8_000));
    assert_eq!(fill_rate, Some(0.8));
}
