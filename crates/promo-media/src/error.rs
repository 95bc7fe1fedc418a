//! Error types for rendering operations.

use thiserror::Error;

/// Result type for rendering operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while rendering cards and videos.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Headless browser not found (set CHROME_PATH or install chromium)")]
    BrowserNotFound,

    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("Browser screenshot failed: {message}")]
    BrowserFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("Image download failed: {message}")]
    DownloadFailed { message: String },

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    pub fn browser_failed(message: impl Into<String>, stderr: Option<String>, exit_code: Option<i32>) -> Self {
        Self::BrowserFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(message: impl Into<String>, stderr: Option<String>, exit_code: Option<i32>) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    pub fn download_failed(message: impl Into<String>) -> Self {
        Self::DownloadFailed {
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether the failure is a missing tool rather than a bad render.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::BrowserNotFound | Self::FfmpegNotFound)
    }
}
