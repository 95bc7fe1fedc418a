//! Health check handlers.

use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::state::AppState;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

/// Liveness probe.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Readiness check response.
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub checks: ReadinessChecks,
}

#[derive(Serialize)]
pub struct ReadinessChecks {
    pub store: CheckStatus,
    pub blob: CheckStatus,
    pub shopee: CheckStatus,
    pub gemini: CheckStatus,
    pub browser: CheckStatus,
    pub ffmpeg: CheckStatus,
}

#[derive(Serialize)]
pub struct CheckStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

impl CheckStatus {
    fn ok(latency_ms: Option<u64>) -> Self {
        Self {
            status: "ok".to_string(),
            error: None,
            latency_ms,
        }
    }

    fn error(msg: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            error: Some(msg.into()),
            latency_ms: None,
        }
    }

    /// Optional adapter without credentials.
    fn disabled() -> Self {
        Self {
            status: "disabled".to_string(),
            error: None,
            latency_ms: None,
        }
    }

    fn from_flag(enabled: bool) -> Self {
        if enabled {
            Self::ok(None)
        } else {
            Self::disabled()
        }
    }

    fn is_failure(&self) -> bool {
        self.status == "error"
    }
}

/// Readiness probe.
///
/// Only the store and a configured blob bucket can fail readiness; missing
/// optional adapters report `disabled`.
pub async fn ready(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    let store_check = {
        let start = Instant::now();
        match state.store.ping().await {
            Ok(()) => CheckStatus::ok(Some(start.elapsed().as_millis() as u64)),
            Err(e) => CheckStatus::error(e.to_string()),
        }
    };

    let blob_check = match &state.blob {
        Some(blob) => {
            let start = Instant::now();
            match blob.check_connectivity().await {
                Ok(()) => CheckStatus::ok(Some(start.elapsed().as_millis() as u64)),
                Err(e) => CheckStatus::error(e.to_string()),
            }
        }
        None => CheckStatus::disabled(),
    };

    let capabilities = state.renderer.capabilities();
    let checks = ReadinessChecks {
        shopee: CheckStatus::from_flag(state.shopee.is_some()),
        gemini: CheckStatus::from_flag(state.descriptions.has_generator()),
        browser: CheckStatus::from_flag(capabilities.browser.is_some()),
        ffmpeg: CheckStatus::from_flag(capabilities.ffmpeg.is_some()),
        store: store_check,
        blob: blob_check,
    };

    let failed = checks.store.is_failure() || checks.blob.is_failure();
    let response = ReadinessResponse {
        status: if failed { "degraded" } else { "ready" }.to_string(),
        checks,
    };

    if failed {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    } else {
        Ok(Json(response))
    }
}
