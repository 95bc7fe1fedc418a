//! Product description generation with a deterministic fallback.

use std::sync::Arc;

use tracing::{info, warn};

use promo_gemini::TextGenerator;
use promo_models::{fallback_description, Description, DescriptionOptions, DescriptionSource, Product};
use promo_store::CacheStore;

use crate::metrics;

/// Generates and caches descriptions.
///
/// Generation never fails: any generator error degrades to
/// [`fallback_description`].
#[derive(Clone)]
pub struct DescriptionService {
    store: Arc<dyn CacheStore>,
    generator: Option<Arc<dyn TextGenerator>>,
}

impl DescriptionService {
    pub fn new(store: Arc<dyn CacheStore>, generator: Option<Arc<dyn TextGenerator>>) -> Self {
        Self { store, generator }
    }

    pub fn has_generator(&self) -> bool {
        self.generator.is_some()
    }

    /// Generate a fresh description and cache it under the product's key.
    pub async fn describe(&self, product: &Product, options: &DescriptionOptions) -> Description {
        let description = self.generate(product, options).await;

        if let Err(e) = self.store.set_description(&description).await {
            warn!(product_id = %product.item_id, error = %e, "Failed to cache description");
        }
        metrics::record_description(description.source.as_str());

        description
    }

    /// Cached description when present, otherwise a freshly generated one.
    pub async fn cached_or_describe(
        &self,
        product: &Product,
        options: &DescriptionOptions,
    ) -> Description {
        match self.store.get_description(&product.item_id).await {
            Ok(Some(cached)) => cached,
            Ok(None) => self.describe(product, options).await,
            Err(e) => {
                warn!(product_id = %product.item_id, error = %e, "Description cache read failed");
                self.describe(product, options).await
            }
        }
    }

    async fn generate(&self, product: &Product, options: &DescriptionOptions) -> Description {
        let Some(generator) = &self.generator else {
            metrics::record_description_fallback("not_configured");
            return Self::fallback(product, options);
        };

        match generator.generate_description(product, options).await {
            Ok(text) if !text.trim().is_empty() => {
                info!(product_id = %product.item_id, chars = text.len(), "Generated description");
                Description::new(&product.item_id, text.trim(), DescriptionSource::Ai)
            }
            Ok(_) => {
                warn!(product_id = %product.item_id, "Generator returned empty text, using fallback");
                metrics::record_description_fallback("empty");
                Self::fallback(product, options)
            }
            Err(e) => {
                warn!(product_id = %product.item_id, error = %e, "Description generation failed, using fallback");
                metrics::record_description_fallback("error");
                Self::fallback(product, options)
            }
        }
    }

    fn fallback(product: &Product, options: &DescriptionOptions) -> Description {
        Description::new(
            &product.item_id,
            fallback_description(product, options),
            DescriptionSource::Fallback,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mockall::mock;
    use promo_gemini::{GeminiError, GeminiResult};
    use promo_models::sample_products;
    use promo_store::FileStore;

    mock! {
        pub Generator {}

        #[async_trait]
        impl TextGenerator for Generator {
            async fn generate_description(
                &self,
                product: &Product,
                options: &DescriptionOptions,
            ) -> GeminiResult<String>;
        }
    }

    async fn store() -> (tempfile::TempDir, Arc<dyn CacheStore>) {
        let dir = tempfile::TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        (dir, Arc::new(store))
    }

    #[tokio::test]
    async fn test_generator_error_falls_back() {
        let (_dir, store) = store().await;
        let mut generator = MockGenerator::new();
        generator
            .expect_generate_description()
            .times(1)
            .returning(|_, _| Err(GeminiError::EmptyResponse));

        let service = DescriptionService::new(store.clone(), Some(Arc::new(generator)));
        let product = sample_products().remove(0);
        let description = service.describe(&product, &DescriptionOptions::default()).await;

        assert_eq!(description.source, DescriptionSource::Fallback);
        assert!(description.text.contains(&product.name));
        assert!(description.text.contains("35%"));

        let cached = store.get_description(&product.item_id).await.unwrap().unwrap();
        assert_eq!(cached.text, description.text);
    }

    #[tokio::test]
    async fn test_generator_text_is_used() {
        let (_dir, store) = store().await;
        let mut generator = MockGenerator::new();
        generator
            .expect_generate_description()
            .returning(|_, _| Ok("  Giảm sốc hôm nay!  ".to_string()));

        let service = DescriptionService::new(store, Some(Arc::new(generator)));
        let product = sample_products().remove(0);
        let description = service.describe(&product, &DescriptionOptions::default()).await;

        assert_eq!(description.source, DescriptionSource::Ai);
        assert_eq!(description.text, "Giảm sốc hôm nay!");
    }

    #[tokio::test]
    async fn test_cached_description_skips_generator() {
        let (_dir, store) = store().await;
        let product = sample_products().remove(0);
        store
            .set_description(&Description::new(&product.item_id, "cached", DescriptionSource::Ai))
            .await
            .unwrap();

        let mut generator = MockGenerator::new();
        generator.expect_generate_description().times(0);

        let service = DescriptionService::new(store, Some(Arc::new(generator)));
        let description = service
            .cached_or_describe(&product, &DescriptionOptions::default())
            .await;
        assert_eq!(description.text, "cached");
    }

    #[tokio::test]
    async fn test_without_generator_uses_fallback() {
        let (_dir, store) = store().await;
        let service = DescriptionService::new(store, None);
        let product = sample_products().remove(1);
        let description = service.describe(&product, &DescriptionOptions::default()).await;
        assert_eq!(description.source, DescriptionSource::Fallback);
        assert!(!description.text.is_empty());
    }
}
