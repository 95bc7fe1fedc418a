//! API routes.

use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

use crate::handlers::cards::create_card;
use crate::handlers::cleanup::cleanup;
use crate::handlers::cron::run_cron;
use crate::handlers::descriptions::{
    create_description, delete_description, download_description, get_description,
};
use crate::handlers::download::{download_file, download_zip};
use crate::handlers::processed::{clear_processed, list_processed, mark_processed};
use crate::handlers::products::{
    cached_products, get_product, get_product_media, list_products, refresh_products,
};
use crate::handlers::schedules::{create_schedule, list_schedules};
use crate::handlers::videos::{create_video, delete_video, get_video, list_videos};
use crate::handlers::{health, ready};
use crate::metrics::metrics_middleware;
use crate::middleware::{
    cors_layer, rate_limit_middleware, request_id, request_logging, security_headers,
    RateLimiterCache,
};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let product_routes = Router::new()
        .route("/products", get(list_products))
        .route("/products/refresh", post(refresh_products))
        .route("/products/cached", get(cached_products))
        .route("/products/:product_id", get(get_product))
        .route("/products/:product_id/media", get(get_product_media));

    let description_routes = Router::new()
        .route("/descriptions", post(create_description))
        .route(
            "/descriptions/:product_id",
            get(get_description).delete(delete_description),
        )
        .route("/descriptions/:product_id/download", get(download_description));

    let artifact_routes = Router::new()
        .route("/cards", post(create_card))
        .route("/videos", get(list_videos).post(create_video))
        .route("/videos/:video_id", get(get_video).delete(delete_video))
        .route("/download", get(download_file))
        .route("/download/zip", get(download_zip));

    let workflow_routes = Router::new()
        .route("/processed", get(list_processed).delete(clear_processed))
        .route("/processed/:product_id", post(mark_processed))
        .route("/schedules", get(list_schedules).post(create_schedule))
        .route("/cron", get(run_cron).post(run_cron))
        .route("/cleanup", post(cleanup));

    let rate_limiter = Arc::new(RateLimiterCache::new(state.config.rate_limit_rps));

    let api_routes = Router::new()
        .merge(product_routes)
        .merge(description_routes)
        .merge(artifact_routes)
        .merge(workflow_routes)
        .layer(middleware::from_fn_with_state(rate_limiter, rate_limit_middleware));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/ready", get(ready));

    let metrics_routes = match metrics_handle {
        Some(handle) => Router::new().route("/metrics", get(move || async move { handle.render() })),
        None => Router::new(),
    };

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(TimeoutLayer::new(state.config.request_timeout))
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
