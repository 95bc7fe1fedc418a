//! Rendering configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Where the rendering tools live and how long they may run.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Explicit Chromium binary (`CHROME_PATH`)
    pub chrome_path: Option<PathBuf>,
    /// Explicit FFmpeg binary (`FFMPEG_PATH`)
    pub ffmpeg_path: Option<PathBuf>,
    /// Screenshot timeout
    pub browser_timeout: Duration,
    /// Slideshow/GIF encode timeout
    pub ffmpeg_timeout: Duration,
    /// Per-image download timeout
    pub download_timeout: Duration,
    /// Largest accepted product image
    pub max_image_bytes: usize,
    /// Parent directory for per-render scratch dirs
    pub work_dir: PathBuf,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            ffmpeg_path: None,
            browser_timeout: Duration::from_secs(60),
            ffmpeg_timeout: Duration::from_secs(180),
            download_timeout: Duration::from_secs(15),
            max_image_bytes: 10 * 1024 * 1024,
            work_dir: std::env::temp_dir().join("promo-render"),
        }
    }
}

impl RenderConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let secs = |name: &str, default: Duration| {
            std::env::var(name)
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(default)
        };
        let path = |name: &str| {
            std::env::var(name)
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from)
        };

        Self {
            chrome_path: path("CHROME_PATH"),
            ffmpeg_path: path("FFMPEG_PATH"),
            browser_timeout: secs("BROWSER_TIMEOUT_SECS", defaults.browser_timeout),
            ffmpeg_timeout: secs("FFMPEG_TIMEOUT_SECS", defaults.ffmpeg_timeout),
            download_timeout: secs("IMAGE_DOWNLOAD_TIMEOUT_SECS", defaults.download_timeout),
            max_image_bytes: std::env::var("MAX_IMAGE_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_image_bytes),
            work_dir: path("RENDER_WORK_DIR").unwrap_or(defaults.work_dir),
        }
    }
}
