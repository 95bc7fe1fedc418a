//! Cron trigger for due schedules.

use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use tracing::warn;

use crate::error::{ApiError, ApiResult};
use crate::services::RunSummary;
use crate::state::AppState;

#[derive(Serialize)]
pub struct CronResponse {
    pub success: bool,
    #[serde(flatten)]
    pub summary: RunSummary,
}

/// Run due schedules. Requires `Authorization: Bearer $CRON_SECRET` when
/// a secret is configured.
pub async fn run_cron(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Json<CronResponse>> {
    if let Some(secret) = state.config.cron_secret.as_deref() {
        let token = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));
        if !token.is_some_and(|t| constant_time_eq(t.trim().as_bytes(), secret.as_bytes())) {
            warn!("Rejected cron call with missing or wrong secret");
            return Err(ApiError::unauthorized("Invalid cron secret"));
        }
    }

    let summary = state.scheduler.run_due(Utc::now()).await?;
    Ok(Json(CronResponse {
        success: true,
        summary,
    }))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
