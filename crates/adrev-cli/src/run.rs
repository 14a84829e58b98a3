//! Command handlers for the CLI.
//!
//! Each handler bootstraps config, registry, pool, and client, hands off to
//! the pipeline driver, prints the run report as JSON, and exits non-zero
//! only when a whole run produced no successful loads.

use adrev_applovin::ReportClient;
use adrev_core::{load_app_config, load_apps, AppTarget};
use adrev_db::{run_migrations, PoolConfig};
use chrono::NaiveDate;
use sqlx::PgPool;

struct RunContext {
    pool: PgPool,
    client: ReportClient,
    apps: Vec<AppTarget>,
}

async fn prepare() -> anyhow::Result<RunContext> {
    let config = load_app_config()?;

    let apps = load_apps(&config.apps_path)?;
    if apps.is_empty() {
        tracing::warn!(
            path = %config.apps_path.display(),
            "application registry is empty; only aggregate reports will load"
        );
    }

    let pool = PoolConfig::from_app_config(&config)
        .connect(&config.database_url)
        .await?;
    let applied = run_migrations(&pool).await?;
    if applied > 0 {
        tracing::info!(applied, "applied pending migrations");
    }

    let client = ReportClient::from_app_config(&config)?;

    Ok(RunContext { pool, client, apps })
}

/// Run one daily ingestion, defaulting to yesterday UTC.
///
/// # Errors
///
/// Returns an error if bootstrap fails or the run produced no successful
/// loads. Partial failures are reported but do not fail the command.
pub(crate) async fn daily(date: Option<NaiveDate>, force: bool) -> anyhow::Result<()> {
    let ctx = prepare().await?;
    let report_date = date.unwrap_or_else(adrev_pipeline::default_report_date);

    let report =
        adrev_pipeline::run_daily(&ctx.pool, &ctx.client, &ctx.apps, report_date, force).await;

    let aggregates_ok =
        usize::from(report.aggregate_basic_ok()) + usize::from(report.aggregate_network_ok());
    println!(
        "ingested {} of {} app reports and {aggregates_ok} of 2 aggregate reports for {report_date}",
        report.user_succeeded(),
        report.apps.len(),
    );
    println!("{}", serde_json::to_string_pretty(&report)?);

    if report.failure_count() > 0 {
        tracing::warn!(
            failures = report.failure_count(),
            "some sources failed during the daily run"
        );
    }
    if !report.succeeded() {
        anyhow::bail!("daily run for {report_date} produced no successful loads");
    }
    Ok(())
}

/// Sweep the last `days` report dates, oldest first.
///
/// # Errors
///
/// Returns an error if bootstrap fails, `days` is zero, or every day in the
/// sweep produced no successful loads.
pub(crate) async fn backfill(days: u32) -> anyhow::Result<()> {
    if days == 0 {
        anyhow::bail!("--days must be at least 1");
    }

    let ctx = prepare().await?;
    let report = adrev_pipeline::run_backfill(&ctx.pool, &ctx.client, &ctx.apps, days).await;

    println!(
        "backfilled {} of {} days in {} ms",
        report.success_days,
        report.days.len(),
        report.elapsed_ms,
    );
    println!("{}", serde_json::to_string_pretty(&report)?);

    if report.failed_days > 0 {
        tracing::warn!(
            failed_days = report.failed_days,
            total_days = report.days.len(),
            "some days failed during the backfill sweep"
        );
    }
    if report.failed_days == report.days.len() {
        anyhow::bail!("backfill produced no successful loads across {days} days");
    }
    Ok(())
}
