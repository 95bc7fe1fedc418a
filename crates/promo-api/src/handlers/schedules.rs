//! Schedule listing and creation.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use promo_models::{Frequency, Schedule, ScheduleOptions};

use crate::error::{ApiError, ApiResult};
use crate::handlers::json_body;
use crate::state::AppState;

/// All fields optional so missing ones become a 400 with a useful message
/// rather than a deserialization failure.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateScheduleRequest {
    pub date: Option<String>,
    pub time: Option<String>,
    pub frequency: Option<String>,
    #[serde(default)]
    pub options: ScheduleOptions,
}

#[derive(Serialize)]
pub struct ScheduleListResponse {
    pub success: bool,
    pub count: usize,
    pub schedules: Vec<Schedule>,
}

#[derive(Serialize)]
pub struct ScheduleResponse {
    pub success: bool,
    pub schedule: Schedule,
}

pub async fn list_schedules(State(state): State<AppState>) -> ApiResult<Json<ScheduleListResponse>> {
    let schedules = state.store.list_schedules().await?;
    Ok(Json(ScheduleListResponse {
        success: true,
        count: schedules.len(),
        schedules,
    }))
}

/// Create a pending schedule. Nothing is stored unless every field validates.
pub async fn create_schedule(
    State(state): State<AppState>,
    body: Result<Json<CreateScheduleRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ScheduleResponse>)> {
    let request = json_body(body)?;
    let schedule = build_schedule(request)?;

    state.store.add_schedule(&schedule).await?;
    info!(
        schedule_id = %schedule.id,
        date = %schedule.date,
        time = %schedule.time,
        frequency = %schedule.frequency,
        "Created schedule"
    );

    Ok((
        StatusCode::CREATED,
        Json(ScheduleResponse {
            success: true,
            schedule,
        }),
    ))
}

fn build_schedule(request: CreateScheduleRequest) -> ApiResult<Schedule> {
    fn present(value: Option<String>) -> Option<String> {
        value.filter(|v| !v.trim().is_empty())
    }

    let (Some(date), Some(time), Some(frequency)) = (
        present(request.date),
        present(request.time),
        present(request.frequency),
    ) else {
        return Err(ApiError::bad_request("Missing required fields: date, time, frequency"));
    };

    let frequency: Frequency = frequency
        .parse()
        .map_err(|e: promo_models::ParseEnumError| ApiError::bad_request(e.to_string()))?;
    request
        .options
        .card
        .validate()
        .map_err(ApiError::bad_request)?;

    Schedule::new(&date, &time, frequency, request.options).map_err(ApiError::bad_request)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(date: Option<&str>, time: Option<&str>, frequency: Option<&str>) -> CreateScheduleRequest {
        CreateScheduleRequest {
            date: date.map(String::from),
            time: time.map(String::from),
            frequency: frequency.map(String::from),
            options: ScheduleOptions::default(),
        }
    }

    #[test]
    fn test_missing_fields_rejected() {
        for req in [
            request(None, Some("08:00"), Some("daily")),
            request(Some("2026-05-01"), None, Some("daily")),
            request(Some("2026-05-01"), Some("08:00"), None),
            request(Some("  "), Some("08:00"), Some("daily")),
        ] {
            let err = build_schedule(req).unwrap_err();
            assert!(matches!(err, ApiError::BadRequest(_)));
        }
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(build_schedule(request(Some("2026-13-01"), Some("08:00"), Some("daily"))).is_err());
        assert!(build_schedule(request(Some("2026-05-01"), Some("25:00"), Some("daily"))).is_err());
        assert!(build_schedule(request(Some("2026-05-01"), Some("08:00"), Some("hourly"))).is_err());
    }

    #[test]
    fn test_valid_request_builds_pending_schedule() {
        let schedule = build_schedule(request(Some("2026-05-01"), Some("08:00"), Some("weekly"))).unwrap();
        assert_eq!(schedule.frequency, Frequency::Weekly);
        assert_eq!(schedule.status, promo_models::ScheduleStatus::Pending);
    }
}
