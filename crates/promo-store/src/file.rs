//! Local JSON-file store used when no Redis URL is configured.
//!
//! Each key group lives in its own file under the database directory.
//! Writes are serialized through one mutex and land via write-then-rename.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use promo_models::{ArtifactMeta, Description, Product, Schedule};

use crate::error::{StoreError, StoreResult};
use crate::store::CacheStore;

const PRODUCTS_FILE: &str = "products.json";
const DESCRIPTIONS_FILE: &str = "descriptions.json";
const PROCESSED_FILE: &str = "processed.json";
const VIDEOS_FILE: &str = "videos.json";
const SCHEDULES_FILE: &str = "schedules.json";
const LOCKS_FILE: &str = "locks.json";

/// JSON-file backed store.
pub struct FileStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open (and create if needed) a store rooted at `dir`.
    pub async fn open(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        info!(dir = %dir.display(), "Using local file store");
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn read<T: DeserializeOwned>(&self, file: &str) -> StoreResult<Option<T>> {
        let path = self.dir.join(file);
        match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => Ok(None),
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| StoreError::corrupt(path.display().to_string(), e.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn read_or_default<T: DeserializeOwned + Default>(&self, file: &str) -> StoreResult<T> {
        Ok(self.read(file).await?.unwrap_or_default())
    }

    /// Caller must hold `write_lock`.
    async fn write<T: Serialize>(&self, file: &str, value: &T) -> StoreResult<()> {
        let path = self.dir.join(file);
        let tmp = self.dir.join(format!(".{}.tmp", file));
        let bytes = serde_json::to_vec_pretty(value)?;
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        debug!(path = %path.display(), "Wrote store file");
        Ok(())
    }

    async fn remove(&self, file: &str) -> StoreResult<()> {
        match tokio::fs::remove_file(self.dir.join(file)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl CacheStore for FileStore {
    fn backend_name(&self) -> &'static str {
        "file"
    }

    async fn ping(&self) -> StoreResult<()> {
        tokio::fs::metadata(&self.dir).await?;
        Ok(())
    }

    async fn get_products(&self) -> StoreResult<Option<Vec<Product>>> {
        self.read(PRODUCTS_FILE).await
    }

    async fn set_products(&self, products: &[Product]) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        self.write(PRODUCTS_FILE, &products).await?;
        info!(count = products.len(), "Cached products list");
        Ok(())
    }

    async fn clear_products(&self) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        self.remove(PRODUCTS_FILE).await
    }

    async fn get_description(&self, product_id: &str) -> StoreResult<Option<Description>> {
        let mut all: BTreeMap<String, Description> = self.read_or_default(DESCRIPTIONS_FILE).await?;
        Ok(all.remove(product_id))
    }

    async fn set_description(&self, description: &Description) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut all: BTreeMap<String, Description> = self.read_or_default(DESCRIPTIONS_FILE).await?;
        all.insert(description.product_id.clone(), description.clone());
        self.write(DESCRIPTIONS_FILE, &all).await
    }

    async fn delete_description(&self, product_id: &str) -> StoreResult<bool> {
        let _guard = self.write_lock.lock().await;
        let mut all: BTreeMap<String, Description> = self.read_or_default(DESCRIPTIONS_FILE).await?;
        let removed = all.remove(product_id).is_some();
        if removed {
            self.write(DESCRIPTIONS_FILE, &all).await?;
        }
        Ok(removed)
    }

    async fn clear_descriptions(&self) -> StoreResult<u64> {
        let _guard = self.write_lock.lock().await;
        let all: BTreeMap<String, Description> = self.read_or_default(DESCRIPTIONS_FILE).await?;
        self.remove(DESCRIPTIONS_FILE).await?;
        Ok(all.len() as u64)
    }

    async fn mark_processed(&self, product_id: &str) -> StoreResult<bool> {
        let _guard = self.write_lock.lock().await;
        let mut ids: BTreeSet<String> = self.read_or_default(PROCESSED_FILE).await?;
        let added = ids.insert(product_id.to_string());
        if added {
            self.write(PROCESSED_FILE, &ids).await?;
        }
        Ok(added)
    }

    async fn is_processed(&self, product_id: &str) -> StoreResult<bool> {
        let ids: BTreeSet<String> = self.read_or_default(PROCESSED_FILE).await?;
        Ok(ids.contains(product_id))
    }

    async fn processed_ids(&self) -> StoreResult<Vec<String>> {
        let ids: BTreeSet<String> = self.read_or_default(PROCESSED_FILE).await?;
        Ok(ids.into_iter().collect())
    }

    async fn clear_processed(&self) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        self.remove(PROCESSED_FILE).await
    }

    async fn register_video(&self, meta: &ArtifactMeta) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut all: BTreeMap<String, ArtifactMeta> = self.read_or_default(VIDEOS_FILE).await?;
        all.insert(meta.id.to_string(), meta.clone());
        self.write(VIDEOS_FILE, &all).await?;
        info!(video_id = %meta.id, product_id = %meta.product_id, "Registered video");
        Ok(())
    }

    async fn get_video(&self, video_id: &str) -> StoreResult<Option<ArtifactMeta>> {
        let mut all: BTreeMap<String, ArtifactMeta> = self.read_or_default(VIDEOS_FILE).await?;
        Ok(all.remove(video_id))
    }

    async fn list_videos(&self) -> StoreResult<Vec<ArtifactMeta>> {
        let all: BTreeMap<String, ArtifactMeta> = self.read_or_default(VIDEOS_FILE).await?;
        let mut videos: Vec<ArtifactMeta> = all.into_values().collect();
        videos.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(videos)
    }

    async fn delete_video(&self, video_id: &str) -> StoreResult<bool> {
        let _guard = self.write_lock.lock().await;
        let mut all: BTreeMap<String, ArtifactMeta> = self.read_or_default(VIDEOS_FILE).await?;
        let removed = all.remove(video_id).is_some();
        if removed {
            self.write(VIDEOS_FILE, &all).await?;
        }
        Ok(removed)
    }

    async fn clear_videos(&self) -> StoreResult<u64> {
        let _guard = self.write_lock.lock().await;
        let all: BTreeMap<String, ArtifactMeta> = self.read_or_default(VIDEOS_FILE).await?;
        self.remove(VIDEOS_FILE).await?;
        Ok(all.len() as u64)
    }

    async fn list_schedules(&self) -> StoreResult<Vec<Schedule>> {
        self.read_or_default(SCHEDULES_FILE).await
    }

    async fn add_schedule(&self, schedule: &Schedule) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut all: Vec<Schedule> = self.read_or_default(SCHEDULES_FILE).await?;
        all.push(schedule.clone());
        self.write(SCHEDULES_FILE, &all).await?;
        info!(schedule_id = %schedule.id, "Stored schedule");
        Ok(())
    }

    async fn update_schedule(&self, schedule: &Schedule) -> StoreResult<bool> {
        let _guard = self.write_lock.lock().await;
        let mut all: Vec<Schedule> = self.read_or_default(SCHEDULES_FILE).await?;
        let Some(slot) = all.iter_mut().find(|s| s.id == schedule.id) else {
            return Ok(false);
        };
        *slot = schedule.clone();
        self.write(SCHEDULES_FILE, &all).await?;
        Ok(true)
    }

    async fn try_acquire_lock(&self, name: &str, ttl: Duration) -> StoreResult<bool> {
        let _guard = self.write_lock.lock().await;
        let now = Utc::now();
        let mut locks: BTreeMap<String, DateTime<Utc>> = self.read_or_default(LOCKS_FILE).await?;

        if let Some(expires_at) = locks.get(name) {
            if *expires_at > now {
                return Ok(false);
            }
        }

        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::seconds(60));
        locks.insert(name.to_string(), now + ttl);
        self.write(LOCKS_FILE, &locks).await?;
        Ok(true)
    }

    async fn release_lock(&self, name: &str) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut locks: BTreeMap<String, DateTime<Utc>> = self.read_or_default(LOCKS_FILE).await?;
        if locks.remove(name).is_some() {
            self.write(LOCKS_FILE, &locks).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ProductSource;
    use promo_models::{
        sample_products, ArtifactFormat, ArtifactId, CardTemplate, ColorScheme, DescriptionSource,
        Frequency, ScheduleOptions,
    };
    use tempfile::TempDir;

    async fn store() -> (TempDir, FileStore) {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path().join("db")).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_empty_store_serves_sample_products() {
        let (_dir, store) = store().await;
        let result = store.products_or_sample().await;
        assert_eq!(result.source, ProductSource::Sample);
        assert_eq!(result.products.len(), sample_products().len());

        store.set_products(&[]).await.unwrap();
        assert_eq!(store.products_or_sample().await.source, ProductSource::Sample);
    }

    #[tokio::test]
    async fn test_cached_products_take_precedence() {
        let (_dir, store) = store().await;
        let mut products = sample_products();
        products.truncate(1);
        products[0].item_id = "cached-1".to_string();
        store.set_products(&products).await.unwrap();

        let result = store.products_or_sample().await;
        assert_eq!(result.source, ProductSource::Cache);
        assert_eq!(result.products[0].item_id, "cached-1");
        assert!(store.find_product("cached-1").await.is_some());
        assert!(store.find_product("sample-1001").await.is_none());
    }

    #[tokio::test]
    async fn test_corrupt_products_fall_back_to_sample() {
        let (_dir, store) = store().await;
        tokio::fs::write(store.dir().join(PRODUCTS_FILE), b"{not json")
            .await
            .unwrap();
        assert!(store.get_products().await.is_err());
        assert_eq!(store.products_or_sample().await.source, ProductSource::Sample);
    }

    #[tokio::test]
    async fn test_mark_processed_is_idempotent() {
        let (_dir, store) = store().await;
        assert!(store.mark_processed("42").await.unwrap());
        assert!(!store.mark_processed("42").await.unwrap());
        assert!(store.is_processed("42").await.unwrap());
        assert_eq!(store.processed_ids().await.unwrap(), vec!["42".to_string()]);

        store.clear_processed().await.unwrap();
        assert!(store.processed_ids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_descriptions_roundtrip_and_clear() {
        let (_dir, store) = store().await;
        store
            .set_description(&Description::new("1", "first", DescriptionSource::Ai))
            .await
            .unwrap();
        store
            .set_description(&Description::new("2", "second", DescriptionSource::Fallback))
            .await
            .unwrap();

        let got = store.get_description("1").await.unwrap().unwrap();
        assert_eq!(got.text, "first");
        assert!(store.delete_description("1").await.unwrap());
        assert!(!store.delete_description("1").await.unwrap());
        assert_eq!(store.clear_descriptions().await.unwrap(), 1);
        assert!(store.get_description("2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_videos_listed_newest_first() {
        let (_dir, store) = store().await;
        for (id, offset) in [("old", 60), ("new", 0)] {
            let meta = ArtifactMeta {
                id: ArtifactId::from_string(id),
                product_id: "p".to_string(),
                format: ArtifactFormat::Mp4,
                template: CardTemplate::Modern,
                color_scheme: ColorScheme::Shopee,
                created_at: Utc::now() - chrono::Duration::seconds(offset),
                size_bytes: 10,
                url: None,
                file_name: None,
            };
            store.register_video(&meta).await.unwrap();
        }

        let videos = store.list_videos().await.unwrap();
        assert_eq!(videos[0].id.as_str(), "new");
        assert!(store.delete_video("old").await.unwrap());
        assert_eq!(store.clear_videos().await.unwrap(), 1);
        assert!(store.get_video("new").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_schedule_add_and_update() {
        let (_dir, store) = store().await;
        let mut schedule = Schedule::new(
            "2030-01-01",
            "09:30",
            Frequency::Daily,
            ScheduleOptions::default(),
        )
        .unwrap();
        store.add_schedule(&schedule).await.unwrap();

        schedule.last_error = Some("boom".to_string());
        assert!(store.update_schedule(&schedule).await.unwrap());

        let stored = store.list_schedules().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].last_error.as_deref(), Some("boom"));

        let other = Schedule::new("2030-01-02", "10:00", Frequency::Once, ScheduleOptions::default())
            .unwrap();
        assert!(!store.update_schedule(&other).await.unwrap());
    }

    #[tokio::test]
    async fn test_lock_is_exclusive_until_released() {
        let (_dir, store) = store().await;
        let ttl = Duration::from_secs(30);
        assert!(store.try_acquire_lock("scheduler", ttl).await.unwrap());
        assert!(!store.try_acquire_lock("scheduler", ttl).await.unwrap());
        store.release_lock("scheduler").await.unwrap();
        assert!(store.try_acquire_lock("scheduler", ttl).await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_lock_can_be_taken() {
        let (_dir, store) = store().await;
        assert!(store.try_acquire_lock("x", Duration::ZERO).await.unwrap());
        assert!(store.try_acquire_lock("x", Duration::from_secs(30)).await.unwrap());
    }
}
