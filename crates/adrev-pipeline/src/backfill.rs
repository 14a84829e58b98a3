//! Backfill driver: replay the daily run over a trailing window of days.

use std::time::Instant;

use adrev_applovin::ReportClient;
use adrev_core::AppTarget;
use chrono::Utc;
use sqlx::PgPool;

use crate::daily::run_daily;
use crate::stats::{BackfillDay, BackfillReport};

/// Re-ingests the last `days` report dates, ending with yesterday.
///
/// Each day is a full [`run_daily`] with `force_update` off, so days already
/// in the warehouse are skipped and only gaps are filled. Days are processed
/// oldest first so an interrupted sweep leaves a contiguous history, and a
/// failed day never stops the sweep.
pub async fn run_backfill(
    pool: &PgPool,
    client: &ReportClient,
    apps: &[AppTarget],
    days: u32,
) -> BackfillReport {
    let sweep_started = Instant::now();
    let today = Utc::now().date_naive();

    tracing::info!(days, "starting backfill sweep");

    let mut day_reports = Vec::new();
    let mut success_days = 0usize;
    let mut failed_days = 0usize;

    for offset in (1..=i64::from(days)).rev() {
        let report_date = today - chrono::Duration::days(offset);
        let day_started = Instant::now();

        let report = run_daily(pool, client, apps, report_date, false).await;

        let succeeded = report.succeeded();
        if succeeded {
            success_days += 1;
        } else {
            failed_days += 1;
            tracing::warn!(%report_date, "backfill day produced no successful loads");
        }
        day_reports.push(BackfillDay {
            report_date,
            succeeded,
            elapsed_ms: elapsed_ms(day_started),
            report,
        });
    }

    let report = BackfillReport {
        days: day_reports,
        success_days,
        failed_days,
        elapsed_ms: elapsed_ms(sweep_started),
    };
    tracing::info!(
        success_days = report.success_days,
        failed_days = report.failed_days,
        elapsed_ms = report.elapsed_ms,
        "backfill sweep finished"
    );
    report
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
