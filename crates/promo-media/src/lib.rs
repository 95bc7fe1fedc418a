//! Rendering adapters for promo cards and videos.
//!
//! This crate provides:
//! - HTML card templates with escaped product fields
//! - Headless Chromium screenshots of rendered cards
//! - FFmpeg command builder/runner for slideshow videos and GIFs
//! - Product image download for video frames

pub mod browser;
pub mod command;
pub mod config;
pub mod download;
pub mod error;
pub mod progress;
pub mod renderer;
pub mod slideshow;
pub mod templates;

pub use browser::{BrowserCommand, BrowserRunner};
pub use command::{check_ffmpeg, FfmpegCommand, FfmpegRunner};
pub use config::RenderConfig;
pub use download::download_images;
pub use error::{MediaError, MediaResult};
pub use progress::FfmpegProgress;
pub use renderer::{RenderCapabilities, Renderer};
pub use slideshow::{convert_to_gif, render_slideshow};
pub use templates::render_card_html;
