//! Prometheus metrics for the API server.

use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and return a handle for `/metrics`.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "promo_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "promo_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "promo_http_requests_in_flight";

    // Generation metrics
    pub const CARDS_GENERATED_TOTAL: &str = "promo_cards_generated_total";
    pub const VIDEOS_GENERATED_TOTAL: &str = "promo_videos_generated_total";
    pub const DESCRIPTIONS_GENERATED_TOTAL: &str = "promo_descriptions_generated_total";
    pub const DESCRIPTION_FALLBACK_TOTAL: &str = "promo_description_fallback_total";
    pub const RENDER_DURATION_SECONDS: &str = "promo_render_duration_seconds";

    // Scheduler metrics
    pub const SCHEDULER_RUNS_TOTAL: &str = "promo_scheduler_runs_total";

    // Rate limiting metrics
    pub const RATE_LIMIT_HITS_TOTAL: &str = "promo_rate_limit_hits_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a generated card.
pub fn record_card_generated(template: &str, format: &str) {
    let labels = [("template", template.to_string()), ("format", format.to_string())];
    counter!(names::CARDS_GENERATED_TOTAL, &labels).increment(1);
}

pub fn record_video_generated(format: &str) {
    let labels = [("format", format.to_string())];
    counter!(names::VIDEOS_GENERATED_TOTAL, &labels).increment(1);
}

/// Record a description by source (`ai` / `fallback`).
pub fn record_description(source: &str) {
    let labels = [("source", source.to_string())];
    counter!(names::DESCRIPTIONS_GENERATED_TOTAL, &labels).increment(1);
}

/// Record a fallback description and why it was needed.
pub fn record_description_fallback(reason: &str) {
    let labels = [("reason", reason.to_string())];
    counter!(names::DESCRIPTION_FALLBACK_TOTAL, &labels).increment(1);
}

/// Record render duration by artifact format.
pub fn record_render_duration(format: &str, duration_secs: f64) {
    let labels = [("format", format.to_string())];
    histogram!(names::RENDER_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a scheduler invocation by outcome (`completed`, `skipped`, `failed`).
pub fn record_scheduler_run(outcome: &str) {
    let labels = [("outcome", outcome.to_string())];
    counter!(names::SCHEDULER_RUNS_TOTAL, &labels).increment(1);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", sanitize_path(endpoint))];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

/// Collapse ID-like path segments so label cardinality stays bounded.
fn sanitize_path(path: &str) -> String {
    let mut previous = "";
    let mut segments = Vec::new();
    for segment in path.split('/') {
        segments.push(if is_id_segment(previous, segment) { ":id" } else { segment });
        previous = segment;
    }
    segments.join("/")
}

fn is_id_segment(previous: &str, segment: &str) -> bool {
    // Path parameters always follow one of these collections
    const COLLECTIONS: &[&str] = &["products", "descriptions", "videos", "processed"];
    if segment.is_empty() || matches!(segment, "refresh" | "cached") {
        return false;
    }
    COLLECTIONS.contains(&previous)
        || (segment.len() >= 6 && segment.chars().any(|c| c.is_ascii_digit()))
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path() {
        assert_eq!(sanitize_path("/api/products/123456/media"), "/api/products/:id/media");
        assert_eq!(sanitize_path("/api/products/refresh"), "/api/products/refresh");
        assert_eq!(
            sanitize_path("/api/videos/550e8400-e29b-41d4-a716-446655440000"),
            "/api/videos/:id"
        );
        assert_eq!(sanitize_path("/api/descriptions/abc/download"), "/api/descriptions/:id/download");
        assert_eq!(sanitize_path("/api/schedules"), "/api/schedules");
        assert_eq!(sanitize_path("/health"), "/health");
    }
}
