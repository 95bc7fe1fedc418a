//! Card generation.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::Response;
use axum::Json;
use serde::Deserialize;

use promo_models::{CardOptions, Product};

use crate::error::ApiResult;
use crate::handlers::products::resolve_product;
use crate::handlers::{artifact_response, json_body};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardRequest {
    pub product_id: Option<String>,
    pub product: Option<Product>,
    #[serde(default)]
    pub options: CardOptions,
    /// Text to print instead of the cached/generated description
    pub description: Option<String>,
    #[serde(default)]
    pub persist: bool,
    #[serde(default)]
    pub inline: bool,
}

pub async fn create_card(
    State(state): State<AppState>,
    body: Result<Json<CardRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let request = json_body(body)?;
    let product = resolve_product(&state, request.product_id.as_deref(), request.product).await?;

    let artifact = state
        .cards
        .generate_card(&product, &request.options, request.description)
        .await?;
    artifact_response(&state, artifact, request.persist, request.inline).await
}
