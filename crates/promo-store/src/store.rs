//! The cache/store trait.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::warn;

use promo_models::{sample_products, ArtifactMeta, Description, Product, Schedule};

use crate::error::StoreResult;

/// Where a product list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSource {
    Shopee,
    Cache,
    Sample,
}

impl ProductSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductSource::Shopee => "shopee",
            ProductSource::Cache => "cache",
            ProductSource::Sample => "sample",
        }
    }
}

/// Product list tagged with its origin.
#[derive(Debug, Clone)]
pub struct ProductsWithSource {
    pub products: Vec<Product>,
    pub source: ProductSource,
}

/// Get/set/delete over the well-known keys.
///
/// Values are overwritten wholesale; there is no eviction.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Short backend name for logs and readiness output.
    fn backend_name(&self) -> &'static str;

    async fn ping(&self) -> StoreResult<()>;

    // Products
    async fn get_products(&self) -> StoreResult<Option<Vec<Product>>>;
    async fn set_products(&self, products: &[Product]) -> StoreResult<()>;
    async fn clear_products(&self) -> StoreResult<()>;

    // Descriptions
    async fn get_description(&self, product_id: &str) -> StoreResult<Option<Description>>;
    async fn set_description(&self, description: &Description) -> StoreResult<()>;
    async fn delete_description(&self, product_id: &str) -> StoreResult<bool>;
    async fn clear_descriptions(&self) -> StoreResult<u64>;

    // Processed set
    /// Add to the processed set. Returns `true` if the ID was not already present.
    async fn mark_processed(&self, product_id: &str) -> StoreResult<bool>;
    async fn is_processed(&self, product_id: &str) -> StoreResult<bool>;
    async fn processed_ids(&self) -> StoreResult<Vec<String>>;
    async fn clear_processed(&self) -> StoreResult<()>;

    // Video registry
    async fn register_video(&self, meta: &ArtifactMeta) -> StoreResult<()>;
    async fn get_video(&self, video_id: &str) -> StoreResult<Option<ArtifactMeta>>;
    async fn list_videos(&self) -> StoreResult<Vec<ArtifactMeta>>;
    async fn delete_video(&self, video_id: &str) -> StoreResult<bool>;
    async fn clear_videos(&self) -> StoreResult<u64>;

    // Schedules
    async fn list_schedules(&self) -> StoreResult<Vec<Schedule>>;
    async fn add_schedule(&self, schedule: &Schedule) -> StoreResult<()>;
    /// Replace the schedule with the same ID. Returns `false` if absent.
    async fn update_schedule(&self, schedule: &Schedule) -> StoreResult<bool>;

    // Locks
    /// Take the named lock for `ttl` unless someone else holds it.
    async fn try_acquire_lock(&self, name: &str, ttl: Duration) -> StoreResult<bool>;
    async fn release_lock(&self, name: &str) -> StoreResult<()>;

    /// Cached products, or the sample dataset when nothing usable is stored.
    async fn products_or_sample(&self) -> ProductsWithSource {
        match self.get_products().await {
            Ok(Some(products)) if !products.is_empty() => ProductsWithSource {
                products,
                source: ProductSource::Cache,
            },
            Ok(_) => ProductsWithSource {
                products: sample_products(),
                source: ProductSource::Sample,
            },
            Err(e) => {
                warn!(backend = self.backend_name(), error = %e, "Product read failed, serving sample data");
                ProductsWithSource {
                    products: sample_products(),
                    source: ProductSource::Sample,
                }
            }
        }
    }

    /// Look up one product from the cached (or sample) list.
    async fn find_product(&self, product_id: &str) -> Option<Product> {
        self.products_or_sample()
            .await
            .products
            .into_iter()
            .find(|p| p.item_id == product_id)
    }

    /// Delete every key in the namespace except schedules.
    async fn clear_all(&self) -> StoreResult<()> {
        self.clear_products().await?;
        self.clear_descriptions().await?;
        self.clear_processed().await?;
        self.clear_videos().await?;
        Ok(())
    }
}
