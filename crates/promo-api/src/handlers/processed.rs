//! The processed-products set.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Serialize)]
pub struct ProcessedListResponse {
    pub success: bool,
    pub count: usize,
    pub processed: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkProcessedResponse {
    pub success: bool,
    pub product_id: String,
    /// `false` when the product was already in the set
    pub added: bool,
}

#[derive(Serialize)]
pub struct ClearResponse {
    pub success: bool,
}

pub async fn list_processed(State(state): State<AppState>) -> ApiResult<Json<ProcessedListResponse>> {
    let processed = state.store.processed_ids().await?;
    Ok(Json(ProcessedListResponse {
        success: true,
        count: processed.len(),
        processed,
    }))
}

/// Mark a product processed. Marking twice is a no-op.
pub async fn mark_processed(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> ApiResult<Json<MarkProcessedResponse>> {
    let product_id = product_id.trim().to_string();
    if product_id.is_empty() {
        return Err(ApiError::bad_request("productId is required"));
    }

    let added = state.store.mark_processed(&product_id).await?;
    Ok(Json(MarkProcessedResponse {
        success: true,
        product_id,
        added,
    }))
}

pub async fn clear_processed(State(state): State<AppState>) -> ApiResult<Json<ClearResponse>> {
    state.store.clear_processed().await?;
    Ok(Json(ClearResponse { success: true }))
}
