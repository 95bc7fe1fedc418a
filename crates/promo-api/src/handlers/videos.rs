//! Video generation and the video registry.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use serde::{Deserialize, Serialize};

use promo_models::{ArtifactMeta, Product, VideoOptions};

use crate::error::{ApiError, ApiResult};
use crate::handlers::products::resolve_product;
use crate::handlers::{artifact_response, json_body};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRequest {
    pub product_id: Option<String>,
    pub product: Option<Product>,
    #[serde(default)]
    pub options: VideoOptions,
    #[serde(default)]
    pub persist: bool,
    #[serde(default)]
    pub inline: bool,
}

#[derive(Serialize)]
pub struct VideoListResponse {
    pub success: bool,
    pub count: usize,
    pub videos: Vec<ArtifactMeta>,
}

#[derive(Serialize)]
pub struct VideoResponse {
    pub success: bool,
    pub video: ArtifactMeta,
}

#[derive(Serialize)]
pub struct VideoDeleteResponse {
    pub success: bool,
    pub deleted: String,
}

pub async fn create_video(
    State(state): State<AppState>,
    body: Result<Json<VideoRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let request = json_body(body)?;
    let product = resolve_product(&state, request.product_id.as_deref(), request.product).await?;

    let artifact = state.cards.generate_video(&product, &request.options).await?;
    artifact_response(&state, artifact, request.persist, request.inline).await
}

/// Registered videos, newest first.
pub async fn list_videos(State(state): State<AppState>) -> ApiResult<Json<VideoListResponse>> {
    let videos = state.store.list_videos().await?;
    Ok(Json(VideoListResponse {
        success: true,
        count: videos.len(),
        videos,
    }))
}

pub async fn get_video(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> ApiResult<Json<VideoResponse>> {
    let video = state
        .store
        .get_video(&video_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Video not found"))?;
    Ok(Json(VideoResponse {
        success: true,
        video,
    }))
}

pub async fn delete_video(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> ApiResult<Json<VideoDeleteResponse>> {
    if !state.cards.remove_video(&video_id).await? {
        return Err(ApiError::not_found("Video not found"));
    }
    Ok(Json(VideoDeleteResponse {
        success: true,
        deleted: video_id,
    }))
}
