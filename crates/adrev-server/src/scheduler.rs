//! Background job scheduler.
//!
//! Initialises a [`JobScheduler`] at server startup and registers the
//! recurring daily ingestion job when `ADREV_DAILY_CRON` is configured.

use std::sync::Arc;

use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use adrev_applovin::ReportClient;
use adrev_core::AppTarget;

use crate::api::RunLock;

/// Starts the cron scheduler that drives unattended daily ingests.
///
/// The caller owns the returned [`JobScheduler`]; dropping the handle
/// stops every registered job.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] when the cron expression does not parse
/// or the scheduler fails to initialise or start.
pub async fn build_scheduler(
    pool: PgPool,
    client: Arc<ReportClient>,
    apps: Arc<Vec<AppTarget>>,
    run_lock: RunLock,
    config: Arc<adrev_core::AppConfig>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    if let Some(cron) = &config.daily_cron {
        register_daily_job(&scheduler, cron, pool, client, apps, run_lock).await?;
        tracing::info!(cron = %cron, "scheduler: daily ingestion job registered");
    } else {
        tracing::info!("ADREV_DAILY_CRON not set; scheduled daily ingestion disabled");
    }

    scheduler.start().await?;
    Ok(scheduler)
}

/// Register the recurring daily ingestion job.
///
/// Each tick ingests yesterday's reports without forcing, and skips entirely
/// when a triggered run already holds the ingestion lock.
async fn register_daily_job(
    scheduler: &JobScheduler,
    cron: &str,
    pool: PgPool,
    client: Arc<ReportClient>,
    apps: Arc<Vec<AppTarget>>,
    run_lock: RunLock,
) -> Result<(), JobSchedulerError> {
    let pool = Arc::new(pool);

    let job = Job::new_async(cron, move |_uuid, _lock| {
        let pool = Arc::clone(&pool);
        let client = Arc::clone(&client);
        let apps = Arc::clone(&apps);
        let run_lock = run_lock.clone();

        Box::pin(async move {
            let Some(_guard) = run_lock.try_acquire() else {
                tracing::warn!("scheduler: run already active; skipping this tick");
                return;
            };

            let report_date = adrev_pipeline::default_report_date();
            tracing::info!(%report_date, "scheduler: starting daily ingestion run");
            let report =
                adrev_pipeline::run_daily(&pool, &client, &apps, report_date, false).await;
            tracing::info!(
                %report_date,
                apps_loaded = report.user_succeeded(),
                failures = report.failure_count(),
                succeeded = report.succeeded(),
                "scheduler: daily ingestion run complete"
            );
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}
