//! Bulk cleanup of cached keys and generated files.

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupScope {
    #[default]
    All,
    Descriptions,
    Processed,
    Videos,
}

#[derive(Debug, Default, Deserialize)]
pub struct CleanupRequest {
    #[serde(default)]
    pub scope: CleanupScope,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupResponse {
    pub success: bool,
    pub scope: CleanupScope,
    pub descriptions_removed: u64,
    pub videos_removed: u64,
    pub files_removed: u64,
    pub temp_removed: u64,
}

/// Delete cached keys in `scope` plus generated and scratch files.
/// Schedules are never touched.
pub async fn cleanup(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<CleanupResponse>> {
    let request: CleanupRequest = if body.iter().all(u8::is_ascii_whitespace) {
        CleanupRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::bad_request(format!("Invalid request body: {}", e)))?
    };
    let scope = request.scope;

    let mut response = CleanupResponse {
        success: true,
        scope,
        descriptions_removed: 0,
        videos_removed: 0,
        files_removed: 0,
        temp_removed: 0,
    };

    if matches!(scope, CleanupScope::All | CleanupScope::Descriptions) {
        response.descriptions_removed = state.store.clear_descriptions().await?;
    }
    if matches!(scope, CleanupScope::All | CleanupScope::Processed) {
        state.store.clear_processed().await?;
    }
    if matches!(scope, CleanupScope::All | CleanupScope::Videos) {
        response.videos_removed = state.store.clear_videos().await?;
    }
    if scope == CleanupScope::All {
        state.store.clear_products().await?;
        response.files_removed = state.output.clear().await?;
        response.temp_removed = clear_work_dir(&state).await;
    }

    info!(
        scope = ?scope,
        descriptions = response.descriptions_removed,
        videos = response.videos_removed,
        files = response.files_removed,
        "Cleanup finished"
    );
    Ok(Json(response))
}

/// Remove leftover render scratch directories.
async fn clear_work_dir(state: &AppState) -> u64 {
    let work_dir = &state.renderer.config().work_dir;
    let mut entries = match tokio::fs::read_dir(work_dir).await {
        Ok(entries) => entries,
        Err(_) => return 0,
    };

    let mut removed = 0;
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        let result = if path.is_dir() {
            tokio::fs::remove_dir_all(&path).await
        } else {
            tokio::fs::remove_file(&path).await
        };
        match result {
            Ok(()) => removed += 1,
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove scratch entry"),
        }
    }
    removed
}
