//! Axum HTTP API server.
//!
//! This crate provides:
//! - Product search/cache routes backed by the Shopee adapter
//! - Description, card and video generation with local fallbacks
//! - Schedules and the cron-triggered scheduler
//! - Download, ZIP and cleanup routes over generated files
//! - Rate limiting, security headers and Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

pub use config::{ApiConfig, SchedulerConfig};
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use services::{CardService, DescriptionService, LocalOutput, SchedulerLoop, SchedulerService};
pub use state::AppState;
