//! Application state.

use std::sync::Arc;

use tracing::{info, warn};

use promo_gemini::{GeminiClient, GeminiError, TextGenerator};
use promo_media::Renderer;
use promo_shopee::ShopeeClient;
use promo_storage::BlobStore;
use promo_store::{open_store_from_env, CacheStore};

use crate::config::ApiConfig;
use crate::services::{CardService, DescriptionService, LocalOutput, SchedulerService};

/// Shared application state.
///
/// Optional adapters are `None` when their credentials are absent; the
/// routes that need them degrade or answer 503.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub store: Arc<dyn CacheStore>,
    pub shopee: Option<Arc<ShopeeClient>>,
    pub blob: Option<Arc<BlobStore>>,
    pub renderer: Arc<Renderer>,
    pub descriptions: DescriptionService,
    pub cards: CardService,
    pub scheduler: SchedulerService,
    pub output: LocalOutput,
}

impl AppState {
    /// Build every adapter from environment variables.
    pub async fn new(config: ApiConfig) -> anyhow::Result<Self> {
        let store = open_store_from_env().await?;
        info!(backend = store.backend_name(), "Store ready");

        let shopee = match ShopeeClient::from_env() {
            Ok(client) => Some(Arc::new(client)),
            Err(e) if e.is_not_configured() => {
                info!("Shopee credentials not set, serving cached/sample products");
                None
            }
            Err(e) => {
                warn!(error = %e, "Shopee client unavailable");
                None
            }
        };

        let generator: Option<Arc<dyn TextGenerator>> = match GeminiClient::from_env() {
            Ok(client) => Some(Arc::new(client)),
            Err(GeminiError::MissingApiKey) => {
                info!("GEMINI_API_KEY not set, descriptions use the built-in template");
                None
            }
            Err(e) => {
                warn!(error = %e, "Gemini client unavailable");
                None
            }
        };

        let blob = match BlobStore::from_env().await {
            Ok(blob) => Some(Arc::new(blob)),
            Err(e) if e.is_config_error() => {
                info!("Blob storage not configured, artifacts are written to {}", config.output_dir.display());
                None
            }
            Err(e) => {
                warn!(error = %e, "Blob storage unavailable");
                None
            }
        };

        let renderer = Renderer::from_env()?;
        let capabilities = renderer.capabilities();
        info!(
            browser = capabilities.browser.is_some(),
            ffmpeg = capabilities.ffmpeg.is_some(),
            "Renderer ready"
        );

        Ok(Self::from_parts(config, store, shopee, generator, blob, Arc::new(renderer)))
    }

    /// Assemble state from already-built adapters.
    pub fn from_parts(
        config: ApiConfig,
        store: Arc<dyn CacheStore>,
        shopee: Option<Arc<ShopeeClient>>,
        generator: Option<Arc<dyn TextGenerator>>,
        blob: Option<Arc<BlobStore>>,
        renderer: Arc<Renderer>,
    ) -> Self {
        let output = LocalOutput::new(config.output_dir.clone());
        let descriptions = DescriptionService::new(store.clone(), generator);
        let cards = CardService::new(
            store.clone(),
            descriptions.clone(),
            renderer.clone(),
            blob.clone(),
            shopee.clone(),
            output.clone(),
        );
        let scheduler = SchedulerService::new(store.clone(), cards.clone(), config.scheduler.lock_ttl);

        Self {
            config,
            store,
            shopee,
            blob,
            renderer,
            descriptions,
            cards,
            scheduler,
            output,
        }
    }

    /// Shopee client, or 503 when credentials are missing.
    pub fn require_shopee(&self) -> crate::error::ApiResult<&ShopeeClient> {
        self.shopee
            .as_deref()
            .ok_or_else(|| crate::error::ApiError::unavailable("Shopee API is not configured"))
    }
}
