//! Shopee client error types.

use thiserror::Error;

pub type ShopeeResult<T> = Result<T, ShopeeError>;

#[derive(Debug, Error)]
pub enum ShopeeError {
    #[error("Shopee affiliate API not configured: {0}")]
    NotConfigured(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Shopee API error {code}: {message}")]
    Api { code: i64, message: String },

    #[error("No data returned for {0}")]
    NoData(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ShopeeError {
    pub fn not_configured(msg: impl Into<String>) -> Self {
        Self::NotConfigured(msg.into())
    }

    pub fn no_data(what: impl Into<String>) -> Self {
        Self::NoData(what.into())
    }

    /// Whether the failure came from missing credentials rather than the upstream.
    pub fn is_not_configured(&self) -> bool {
        matches!(self, ShopeeError::NotConfigured(_))
    }
}
