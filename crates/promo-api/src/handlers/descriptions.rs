//! Description generation and the description cache.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use promo_models::{Description, DescriptionOptions, Product};

use crate::error::{ApiError, ApiResult};
use crate::handlers::products::resolve_product;
use crate::handlers::{attachment, json_body};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptionRequest {
    pub product_id: Option<String>,
    pub product: Option<Product>,
    #[serde(default)]
    pub options: DescriptionOptions,
}

#[derive(Serialize)]
pub struct DescriptionResponse {
    pub success: bool,
    pub description: Description,
}

#[derive(Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub deleted: bool,
}

/// Generate (or fall back) and cache a description.
pub async fn create_description(
    State(state): State<AppState>,
    body: Result<Json<DescriptionRequest>, JsonRejection>,
) -> ApiResult<Json<DescriptionResponse>> {
    let request = json_body(body)?;
    let product = resolve_product(&state, request.product_id.as_deref(), request.product).await?;

    let description = state.descriptions.describe(&product, &request.options).await;
    Ok(Json(DescriptionResponse {
        success: true,
        description,
    }))
}

async fn cached(state: &AppState, product_id: &str) -> ApiResult<Description> {
    state
        .store
        .get_description(product_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Description not found"))
}

pub async fn get_description(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> ApiResult<Json<DescriptionResponse>> {
    let description = cached(&state, &product_id).await?;
    Ok(Json(DescriptionResponse {
        success: true,
        description,
    }))
}

pub async fn delete_description(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> ApiResult<Json<DeleteResponse>> {
    let deleted = state.store.delete_description(&product_id).await?;
    Ok(Json(DeleteResponse {
        success: true,
        deleted,
    }))
}

/// Cached description as a `.txt` attachment.
pub async fn download_description(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> ApiResult<Response> {
    let description = cached(&state, &product_id).await?;
    let file_name = format!("description_{}.txt", product_id);

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, attachment(&file_name)),
        ],
        description.text,
    )
        .into_response())
}
