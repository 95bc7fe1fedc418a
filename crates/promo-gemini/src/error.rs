//! Gemini client error types.

use thiserror::Error;

pub type GeminiResult<T> = Result<T, GeminiError>;

#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("GEMINI_API_KEY not configured")]
    MissingApiKey,

    #[error("Gemini API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("No content in Gemini response")]
    EmptyResponse,

    #[error("Response blocked: {0}")]
    Blocked(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
