//! Product listing, refresh and lookup.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use promo_models::{Product, ProductMedia, ProductQuery};
use promo_shopee::PageInfo;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductListResponse {
    pub success: bool,
    /// `shopee`, `cache` or `sample`
    pub source: &'static str,
    pub count: usize,
    pub products: Vec<Product>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_info: Option<PageInfo>,
}

#[derive(Serialize)]
pub struct ProductResponse {
    pub success: bool,
    pub product: Product,
}

#[derive(Serialize)]
pub struct ProductMediaResponse {
    pub success: bool,
    pub media: ProductMedia,
}

fn validate_query(query: &ProductQuery) -> ApiResult<()> {
    query
        .validate()
        .map_err(|e| ApiError::bad_request(format!("Invalid query: {}", e)))
}

/// Search Shopee, or serve cached/sample products when it is not configured.
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> ApiResult<Json<ProductListResponse>> {
    validate_query(&query)?;

    if state.shopee.is_none() {
        return cached_products(State(state)).await;
    }

    let page = state.require_shopee()?.search_products(&query).await?;
    Ok(Json(ProductListResponse {
        success: true,
        source: "shopee",
        count: page.products.len(),
        products: page.products,
        page_info: Some(page.page_info),
    }))
}

/// Cached products, falling back to the sample dataset.
pub async fn cached_products(State(state): State<AppState>) -> ApiResult<Json<ProductListResponse>> {
    let result = state.store.products_or_sample().await;
    Ok(Json(ProductListResponse {
        success: true,
        source: result.source.as_str(),
        count: result.products.len(),
        products: result.products,
        page_info: None,
    }))
}

/// Fetch from Shopee and overwrite the cached product list.
pub async fn refresh_products(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<ProductListResponse>> {
    // The body is optional; an empty POST refreshes with default parameters
    let query = if body.iter().all(u8::is_ascii_whitespace) {
        ProductQuery::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::bad_request(format!("Invalid request body: {}", e)))?
    };
    validate_query(&query)?;

    let page = state.require_shopee()?.search_products(&query).await?;
    // An empty page never replaces a good cache
    if page.products.is_empty() {
        return Err(ApiError::not_found("Shopee returned no products"));
    }
    state.store.set_products(&page.products).await?;
    info!(count = page.products.len(), "Refreshed cached products");

    Ok(Json(ProductListResponse {
        success: true,
        source: "shopee",
        count: page.products.len(),
        products: page.products,
        page_info: Some(page.page_info),
    }))
}

/// One product by item ID.
pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> ApiResult<Json<ProductResponse>> {
    let product = resolve_product(&state, Some(&product_id), None).await?;
    Ok(Json(ProductResponse {
        success: true,
        product,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaQuery {
    pub shop_id: Option<String>,
}

/// Images and videos for one product from the Shopee item endpoint.
pub async fn get_product_media(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
    Query(query): Query<MediaQuery>,
) -> ApiResult<Json<ProductMediaResponse>> {
    let shopee = state.require_shopee()?;

    let shop_id = match query.shop_id.filter(|s| !s.trim().is_empty()) {
        Some(shop_id) => shop_id,
        None => state
            .store
            .find_product(&product_id)
            .await
            .map(|p| p.shop_id)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ApiError::bad_request("shopId is required for products that are not cached"))?,
    };

    let media = shopee.get_product_media(&product_id, &shop_id).await?;
    Ok(Json(ProductMediaResponse {
        success: true,
        media,
    }))
}

/// Pick the product a generation request refers to.
///
/// An inline `product` wins; otherwise the ID is looked up in the cache (or
/// sample data) and then on Shopee.
pub(crate) async fn resolve_product(
    state: &AppState,
    product_id: Option<&str>,
    product: Option<Product>,
) -> ApiResult<Product> {
    if let Some(product) = product {
        return Ok(product);
    }

    let product_id = product_id
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::bad_request("productId or product is required"))?;

    if let Some(product) = state.store.find_product(product_id).await {
        return Ok(product);
    }

    match state.shopee.as_deref() {
        Some(shopee) => Ok(shopee.get_product(product_id).await?),
        None => Err(ApiError::not_found(format!("Product not found: {}", product_id))),
    }
}
