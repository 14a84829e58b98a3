use axum::{extract::State, Extension, Json};
use chrono::NaiveDate;
use serde::Deserialize;

use adrev_pipeline::{default_report_date, run_backfill, run_daily, BackfillReport, DailyReport};

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Default, Deserialize)]
pub(super) struct DailyRunBody {
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub force_update: bool,
}

#[derive(Debug, Deserialize)]
pub(super) struct BackfillRunBody {
    pub days: u32,
}

/// Runs one daily ingestion cycle. An omitted body or date means yesterday.
pub(super) async fn trigger_daily(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Option<Json<DailyRunBody>>,
) -> Result<Json<ApiResponse<DailyReport>>, ApiError> {
    let body = body.map_or_else(DailyRunBody::default, |Json(b)| b);
    let report_date = body.date.unwrap_or_else(default_report_date);

    let Some(_guard) = state.run_lock.try_acquire() else {
        tracing::warn!(%report_date, "api: daily trigger rejected; another run is active");
        return Err(ApiError::new(
            req_id.0,
            "run_in_progress",
            "an ingestion run is already active",
        ));
    };

    tracing::info!(%report_date, force_update = body.force_update, "api: daily run triggered");
    let report = run_daily(
        &state.pool,
        &state.client,
        &state.apps,
        report_date,
        body.force_update,
    )
    .await;

    Ok(Json(ApiResponse {
        data: report,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// Runs ingestion for the `days` calendar days before today, oldest first.
pub(super) async fn trigger_backfill(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<BackfillRunBody>,
) -> Result<Json<ApiResponse<BackfillReport>>, ApiError> {
    if body.days == 0 {
        return Err(ApiError::new(
            req_id.0,
            "bad_request",
            "days must be at least 1",
        ));
    }

    let Some(_guard) = state.run_lock.try_acquire() else {
        tracing::warn!(days = body.days, "api: backfill trigger rejected; another run is active");
        return Err(ApiError::new(
            req_id.0,
            "run_in_progress",
            "an ingestion run is already active",
        ));
    };

    tracing::info!(days = body.days, "api: backfill triggered");
    let report = run_backfill(&state.pool, &state.client, &state.apps, body.days).await;

    Ok(Json(ApiResponse {
        data: report,
        meta: ResponseMeta::new(req_id.0),
    }))
}
