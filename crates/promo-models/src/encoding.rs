//! Rendering and encoding constants.

/// Card viewport (portrait, 4:5)
pub const CARD_WIDTH: u32 = 1080;
pub const CARD_HEIGHT: u32 = 1350;

/// Video frame size (9:16 vertical)
pub const VIDEO_WIDTH: u32 = 1080;
pub const VIDEO_HEIGHT: u32 = 1920;
pub const VIDEO_FPS: u32 = 30;

/// Default video codec (H.264)
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
/// Default encoding preset
pub const DEFAULT_PRESET: &str = "fast";
/// Default CRF
pub const DEFAULT_CRF: u8 = 23;
/// Pixel format playable everywhere
pub const DEFAULT_PIX_FMT: &str = "yuv420p";

/// GIF output settings
pub const GIF_FPS: u32 = 10;
pub const GIF_WIDTH: u32 = 480;

/// Cross-fade between slideshow images (seconds)
pub const SLIDE_FADE_SECS: f64 = 0.4;
