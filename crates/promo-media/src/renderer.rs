//! High-level rendering entry points used by the card service.

use std::path::PathBuf;

use tempfile::TempDir;
use tracing::{debug, info};

use promo_models::{ArtifactFormat, CardOptions, Product, VideoOptions};

use crate::browser::{BrowserCommand, BrowserRunner};
use crate::command::{check_ffmpeg, FfmpegRunner};
use crate::config::RenderConfig;
use crate::download::download_images;
use crate::error::{MediaError, MediaResult};
use crate::slideshow::{convert_to_gif, render_slideshow, still_command};
use crate::templates::render_card_html;

/// Which external tools are usable.
#[derive(Debug, Clone, Default)]
pub struct RenderCapabilities {
    pub browser: Option<PathBuf>,
    pub ffmpeg: Option<PathBuf>,
}

/// Renders cards (HTML, PNG, JPEG) and slideshow videos (MP4, GIF).
#[derive(Debug, Clone)]
pub struct Renderer {
    config: RenderConfig,
    http: reqwest::Client,
}

impl Renderer {
    pub fn new(config: RenderConfig) -> MediaResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.download_timeout)
            .build()
            .map_err(|e| MediaError::internal(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { config, http })
    }

    pub fn from_env() -> MediaResult<Self> {
        Self::new(RenderConfig::from_env())
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn capabilities(&self) -> RenderCapabilities {
        RenderCapabilities {
            browser: BrowserRunner::locate(self.config.chrome_path.as_deref()).ok(),
            ffmpeg: self.ffmpeg_binary().ok(),
        }
    }

    fn ffmpeg_binary(&self) -> MediaResult<PathBuf> {
        match &self.config.ffmpeg_path {
            Some(path) if path.exists() => Ok(path.clone()),
            Some(_) => Err(MediaError::FfmpegNotFound),
            None => check_ffmpeg(),
        }
    }

    fn ffmpeg(&self) -> MediaResult<FfmpegRunner> {
        Ok(FfmpegRunner::with_binary(self.ffmpeg_binary()?).with_timeout(self.config.ffmpeg_timeout))
    }

    async fn scratch_dir(&self) -> MediaResult<TempDir> {
        tokio::fs::create_dir_all(&self.config.work_dir).await?;
        Ok(tempfile::Builder::new()
            .prefix("render-")
            .tempdir_in(&self.config.work_dir)?)
    }

    /// Render one card in the format named by `options.format`.
    pub async fn render_card(
        &self,
        product: &Product,
        description: Option<&str>,
        options: &CardOptions,
    ) -> MediaResult<Vec<u8>> {
        let html = render_card_html(product, description, options);

        match options.format {
            ArtifactFormat::Html => Ok(html.into_bytes()),
            ArtifactFormat::Png | ArtifactFormat::Jpeg => self.screenshot_html(&html, options.format).await,
            other => Err(MediaError::invalid_input(format!("{} is not a card format", other))),
        }
    }

    /// Screenshot an HTML document as PNG or JPEG.
    pub async fn screenshot_html(&self, html: &str, format: ArtifactFormat) -> MediaResult<Vec<u8>> {
        let browser = BrowserRunner::new(
            BrowserRunner::locate(self.config.chrome_path.as_deref())?,
            self.config.browser_timeout,
        );
        // Check FFmpeg before launching the browser when we will need it
        let jpeg_runner = match format {
            ArtifactFormat::Png => None,
            ArtifactFormat::Jpeg => Some(self.ffmpeg()?),
            other => return Err(MediaError::invalid_input(format!("cannot screenshot to {}", other))),
        };

        let scratch = self.scratch_dir().await?;
        let html_path = scratch.path().join("card.html");
        let png_path = scratch.path().join("card.png");
        tokio::fs::write(&html_path, html).await?;

        let started = std::time::Instant::now();
        browser
            .screenshot(&BrowserCommand::new(&html_path, &png_path))
            .await?;
        debug!(elapsed_ms = started.elapsed().as_millis() as u64, "Card screenshot taken");

        let bytes = match jpeg_runner {
            None => tokio::fs::read(&png_path).await?,
            Some(runner) => {
                let jpg_path = scratch.path().join("card.jpg");
                runner.run(&still_command(&png_path, &jpg_path)).await?;
                tokio::fs::read(&jpg_path).await?
            }
        };

        Ok(bytes)
    }

    /// Render a slideshow from product images, optionally led by a card frame.
    pub async fn render_video(
        &self,
        image_urls: &[String],
        card_frame: Option<Vec<u8>>,
        options: &VideoOptions,
    ) -> MediaResult<Vec<u8>> {
        if !options.format.is_motion() {
            return Err(MediaError::invalid_input(format!("{} is not a video format", options.format)));
        }
        let runner = self.ffmpeg()?;
        let scratch = self.scratch_dir().await?;

        let mut frames = Vec::with_capacity(options.max_images + 1);
        if let Some(card) = card_frame {
            let card_path = scratch.path().join("card_frame.png");
            tokio::fs::write(&card_path, card).await?;
            frames.push(card_path);
        }

        let images = download_images(
            &self.http,
            image_urls,
            scratch.path(),
            options.max_images,
            self.config.max_image_bytes,
        )
        .await?;
        frames.extend(images);

        let mp4_path = scratch.path().join("slideshow.mp4");
        render_slideshow(&runner, &frames, options.seconds_per_image, &mp4_path).await?;

        let output = match options.format {
            ArtifactFormat::Gif => {
                let gif_path = scratch.path().join("slideshow.gif");
                convert_to_gif(&runner, &mp4_path, &gif_path).await?;
                gif_path
            }
            _ => mp4_path,
        };

        let bytes = tokio::fs::read(&output).await?;
        info!(frames = frames.len(), bytes = bytes.len(), format = %options.format, "Rendered video");
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use promo_models::sample_products;

    fn renderer(dir: &std::path::Path) -> Renderer {
        Renderer::new(RenderConfig {
            chrome_path: Some(PathBuf::from("/nonexistent/chrome")),
            ffmpeg_path: Some(PathBuf::from("/nonexistent/ffmpeg")),
            work_dir: dir.to_path_buf(),
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_html_card_needs_no_tools() {
        let dir = tempfile::TempDir::new().unwrap();
        let product = sample_products().remove(0);
        let options = CardOptions {
            format: ArtifactFormat::Html,
            ..Default::default()
        };
        let bytes = renderer(dir.path())
            .render_card(&product, Some("desc"), &options)
            .await
            .unwrap();
        let html = String::from_utf8(bytes).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
    }

    #[tokio::test]
    async fn test_missing_tools_are_reported() {
        let dir = tempfile::TempDir::new().unwrap();
        let renderer = renderer(dir.path());
        let product = sample_products().remove(0);

        let err = renderer
            .render_card(&product, None, &CardOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::BrowserNotFound));

        let err = renderer
            .render_video(&product.all_images(), None, &VideoOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::FfmpegNotFound));

        let caps = renderer.capabilities();
        assert!(caps.browser.is_none());
        assert!(caps.ffmpeg.is_none());
    }

    #[tokio::test]
    async fn test_motion_format_is_not_a_card() {
        let dir = tempfile::TempDir::new().unwrap();
        let options = CardOptions {
            format: ArtifactFormat::Gif,
            ..Default::default()
        };
        let err = renderer(dir.path())
            .render_card(&sample_products().remove(0), None, &options)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not a card format"));
    }
}
