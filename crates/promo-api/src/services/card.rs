//! Card and video generation plus artifact persistence.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use promo_media::{MediaError, Renderer};
use promo_models::{
    Artifact, ArtifactFormat, ArtifactMeta, CardOptions, DescriptionOptions, Product, VideoOptions,
};
use promo_shopee::ShopeeClient;
use promo_storage::BlobStore;
use promo_store::CacheStore;

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::services::description::DescriptionService;
use crate::services::output::LocalOutput;

/// Renders cards and videos and stores the results.
#[derive(Clone)]
pub struct CardService {
    store: Arc<dyn CacheStore>,
    descriptions: DescriptionService,
    renderer: Arc<Renderer>,
    blob: Option<Arc<BlobStore>>,
    shopee: Option<Arc<ShopeeClient>>,
    output: LocalOutput,
}

impl CardService {
    pub fn new(
        store: Arc<dyn CacheStore>,
        descriptions: DescriptionService,
        renderer: Arc<Renderer>,
        blob: Option<Arc<BlobStore>>,
        shopee: Option<Arc<ShopeeClient>>,
        output: LocalOutput,
    ) -> Self {
        Self {
            store,
            descriptions,
            renderer,
            blob,
            shopee,
            output,
        }
    }

    pub fn output(&self) -> &LocalOutput {
        &self.output
    }

    /// Render one card. `description` overrides the cached/generated text.
    pub async fn generate_card(
        &self,
        product: &Product,
        options: &CardOptions,
        description: Option<String>,
    ) -> ApiResult<Artifact> {
        options.validate().map_err(ApiError::bad_request)?;

        let description = match description {
            Some(text) => Some(text),
            None if options.show_description => Some(
                self.descriptions
                    .cached_or_describe(product, &DescriptionOptions::default())
                    .await
                    .text,
            ),
            None => None,
        };

        let started = Instant::now();
        let bytes = self
            .renderer
            .render_card(product, description.as_deref(), options)
            .await?;
        metrics::record_render_duration(options.format.extension(), started.elapsed().as_secs_f64());
        metrics::record_card_generated(options.template.as_str(), options.format.extension());

        let mut artifact = Artifact::new(
            &product.item_id,
            options.format,
            options.template,
            options.color_scheme,
            bytes,
        );
        artifact.meta.file_name = Some(artifact.meta.suggested_file_name());

        info!(
            product_id = %product.item_id,
            format = %options.format,
            template = %options.template,
            bytes = artifact.bytes.len(),
            "Generated card"
        );
        Ok(artifact)
    }

    /// Render a slideshow (MP4 or GIF) from the product's images.
    pub async fn generate_video(&self, product: &Product, options: &VideoOptions) -> ApiResult<Artifact> {
        options.validate().map_err(ApiError::bad_request)?;

        let image_urls = self.image_urls(product).await;
        if image_urls.is_empty() {
            return Err(ApiError::bad_request(format!(
                "Product {} has no images",
                product.item_id
            )));
        }

        let card_frame = if options.include_card {
            self.card_frame(product, &options.card).await?
        } else {
            None
        };

        let started = Instant::now();
        let bytes = self
            .renderer
            .render_video(&image_urls, card_frame, options)
            .await?;
        metrics::record_render_duration(options.format.extension(), started.elapsed().as_secs_f64());
        metrics::record_video_generated(options.format.extension());

        let mut artifact = Artifact::new(
            &product.item_id,
            options.format,
            options.card.template,
            options.card.color_scheme,
            bytes,
        );
        artifact.meta.file_name = Some(artifact.meta.suggested_file_name());

        info!(
            product_id = %product.item_id,
            format = %options.format,
            images = image_urls.len(),
            bytes = artifact.bytes.len(),
            "Generated video"
        );
        Ok(artifact)
    }

    /// Upload to blob storage when configured, otherwise write to the local
    /// output directory. Videos are also added to the registry.
    pub async fn persist(&self, artifact: &Artifact) -> ApiResult<ArtifactMeta> {
        let mut meta = artifact.meta.clone();
        let file_name = meta
            .file_name
            .clone()
            .unwrap_or_else(|| meta.suggested_file_name());
        meta.file_name = Some(file_name.clone());

        let url = match &self.blob {
            Some(blob) => blob.put_artifact(&meta, artifact.bytes.clone()).await?.url,
            None => {
                self.output.write(&file_name, &artifact.bytes).await?;
                self.output.download_url(&file_name)
            }
        };
        meta.url = Some(url);

        if meta.format.is_motion() {
            self.store.register_video(&meta).await?;
        }

        Ok(meta)
    }

    /// Drop a video from the registry and delete its local file.
    pub async fn remove_video(&self, video_id: &str) -> ApiResult<bool> {
        let Some(meta) = self.store.get_video(video_id).await? else {
            return Ok(false);
        };
        self.store.delete_video(video_id).await?;

        if let Some(file_name) = meta.file_name.as_deref() {
            if let Err(e) = self.output.remove(file_name).await {
                warn!(video_id, error = %e, "Failed to remove local video file");
            }
        }
        Ok(true)
    }

    /// Product images, topped up from the Shopee media endpoint when available.
    async fn image_urls(&self, product: &Product) -> Vec<String> {
        let mut urls = product.all_images();

        if let Some(shopee) = &self.shopee {
            if !product.shop_id.is_empty() {
                match shopee.get_product_media(&product.item_id, &product.shop_id).await {
                    Ok(media) => {
                        for url in media.images {
                            if !urls.contains(&url) {
                                urls.push(url);
                            }
                        }
                    }
                    Err(e) => {
                        warn!(product_id = %product.item_id, error = %e, "Media lookup failed, using cached images")
                    }
                }
            }
        }

        urls
    }

    /// PNG card used as the first video frame; skipped when no browser is available.
    async fn card_frame(&self, product: &Product, options: &CardOptions) -> ApiResult<Option<Vec<u8>>> {
        let frame_options = CardOptions {
            format: ArtifactFormat::Png,
            ..options.clone()
        };
        match self.generate_card(product, &frame_options, None).await {
            Ok(artifact) => Ok(Some(artifact.bytes)),
            Err(ApiError::Media(MediaError::BrowserNotFound)) => {
                warn!(product_id = %product.item_id, "No browser available, video will not include a card frame");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use promo_media::RenderConfig;
    use promo_models::{sample_products, ArtifactId};
    use promo_store::FileStore;

    struct Fixture {
        _dir: tempfile::TempDir,
        store: Arc<dyn CacheStore>,
        service: CardService,
    }

    async fn fixture() -> Fixture {
        let dir = tempfile::TempDir::new().unwrap();
        let store: Arc<dyn CacheStore> = Arc::new(FileStore::open(dir.path().join("db")).await.unwrap());
        let renderer = Renderer::new(RenderConfig {
            chrome_path: Some(PathBuf::from("/nonexistent/chrome")),
            ffmpeg_path: Some(PathBuf::from("/nonexistent/ffmpeg")),
            work_dir: dir.path().join("work"),
            ..Default::default()
        })
        .unwrap();
        let service = CardService::new(
            store.clone(),
            DescriptionService::new(store.clone(), None),
            Arc::new(renderer),
            None,
            None,
            LocalOutput::new(dir.path().join("out")),
        );
        Fixture {
            _dir: dir,
            store,
            service,
        }
    }

    fn html_options() -> CardOptions {
        CardOptions {
            format: ArtifactFormat::Html,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_html_card_includes_fallback_description() {
        let fx = fixture().await;
        let product = sample_products().remove(0);

        let artifact = fx
            .service
            .generate_card(&product, &html_options(), None)
            .await
            .unwrap();
        let html = String::from_utf8(artifact.bytes).unwrap();
        assert!(html.contains("template-modern"));
        assert!(artifact.meta.file_name.unwrap().ends_with(".html"));

        // The generated description was cached on the way
        assert!(fx.store.get_description(&product.item_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_png_without_browser_is_unavailable() {
        let fx = fixture().await;
        let product = sample_products().remove(0);
        let err = fx
            .service
            .generate_card(&product, &CardOptions::default(), Some("x".into()))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_invalid_accent_is_bad_request() {
        let fx = fixture().await;
        let product = sample_products().remove(0);
        let options = CardOptions {
            accent_color: Some("red".into()),
            ..html_options()
        };
        let err = fx.service.generate_card(&product, &options, None).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_persist_writes_local_file() {
        let fx = fixture().await;
        let product = sample_products().remove(0);
        let artifact = fx
            .service
            .generate_card(&product, &html_options(), Some("desc".into()))
            .await
            .unwrap();

        let meta = fx.service.persist(&artifact).await.unwrap();
        let file_name = meta.file_name.clone().unwrap();
        assert_eq!(meta.url.as_deref(), Some(format!("/api/download?file={}", file_name).as_str()));
        assert_eq!(fx.service.output().read(&file_name).await.unwrap(), artifact.bytes);

        // Cards are not registered as videos
        assert!(fx.store.list_videos().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_persist_and_remove_video() {
        let fx = fixture().await;
        let mut artifact = Artifact::new(
            "sample-1001",
            ArtifactFormat::Mp4,
            Default::default(),
            Default::default(),
            vec![0, 0, 0, 24],
        );
        artifact.meta.id = ArtifactId::from_string("vid-1");

        let meta = fx.service.persist(&artifact).await.unwrap();
        assert_eq!(fx.store.get_video("vid-1").await.unwrap(), Some(meta.clone()));

        assert!(fx.service.remove_video("vid-1").await.unwrap());
        assert!(!fx.service.remove_video("vid-1").await.unwrap());
        let file_name = meta.file_name.unwrap();
        assert!(matches!(fx.service.output().read(&file_name).await, Err(ApiError::NotFound(_))));
    }
}
