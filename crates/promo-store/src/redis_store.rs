//! Redis-backed store.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use tracing::{debug, info};
use uuid::Uuid;

use promo_models::{keys, ArtifactFormat, ArtifactId, ArtifactMeta, Description, Product, Schedule};

use crate::error::{StoreError, StoreResult};
use crate::store::CacheStore;

/// Deletes the lock only if we still own it.
const RELEASE_LOCK_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

/// Store over a Redis-compatible server (Redis, Valkey, Upstash).
pub struct RedisStore {
    client: redis::Client,
    /// Value written into lock keys so only this instance releases them
    holder_id: String,
}

impl RedisStore {
    pub fn new(redis_url: &str) -> StoreResult<Self> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self {
            client,
            holder_id: Uuid::new_v4().to_string(),
        })
    }

    async fn conn(&self) -> StoreResult<redis::aio::MultiplexedConnection> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }

    async fn scan_keys(&self, pattern: &str) -> StoreResult<Vec<String>> {
        let mut conn = self.conn().await?;
        let mut cursor: u64 = 0;
        let mut found = Vec::new();

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(200)
                .query_async(&mut conn)
                .await?;
            found.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        Ok(found)
    }
}

fn video_to_fields(meta: &ArtifactMeta) -> Vec<(&'static str, String)> {
    let mut fields = vec![
        ("id", meta.id.to_string()),
        ("productId", meta.product_id.clone()),
        ("format", meta.format.extension().to_string()),
        ("template", meta.template.as_str().to_string()),
        ("colorScheme", meta.color_scheme.as_str().to_string()),
        ("createdAt", meta.created_at.to_rfc3339()),
        ("sizeBytes", meta.size_bytes.to_string()),
    ];
    if let Some(url) = &meta.url {
        fields.push(("url", url.clone()));
    }
    if let Some(file_name) = &meta.file_name {
        fields.push(("fileName", file_name.clone()));
    }
    fields
}

fn video_from_fields(key: &str, mut fields: HashMap<String, String>) -> StoreResult<ArtifactMeta> {
    let mut take = |name: &str| {
        fields
            .remove(name)
            .ok_or_else(|| StoreError::corrupt(key, format!("missing field {}", name)))
    };

    let id = take("id")?;
    let product_id = take("productId")?;
    let format: ArtifactFormat = take("format")?
        .parse()
        .map_err(|e: promo_models::ParseEnumError| StoreError::corrupt(key, e.to_string()))?;
    let template = take("template")?
        .parse()
        .map_err(|e: promo_models::ParseEnumError| StoreError::corrupt(key, e.to_string()))?;
    let color_scheme = take("colorScheme")?
        .parse()
        .map_err(|e: promo_models::ParseEnumError| StoreError::corrupt(key, e.to_string()))?;
    let created_at = DateTime::parse_from_rfc3339(&take("createdAt")?)
        .map_err(|e| StoreError::corrupt(key, e.to_string()))?
        .with_timezone(&Utc);
    let size_bytes = take("sizeBytes")?.parse().unwrap_or(0);

    Ok(ArtifactMeta {
        id: ArtifactId::from_string(id),
        product_id,
        format,
        template,
        color_scheme,
        created_at,
        size_bytes,
        url: fields.remove("url"),
        file_name: fields.remove("fileName"),
    })
}

#[async_trait]
impl CacheStore for RedisStore {
    fn backend_name(&self) -> &'static str {
        "redis"
    }

    async fn ping(&self) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(())
    }

    async fn get_products(&self) -> StoreResult<Option<Vec<Product>>> {
        let mut conn = self.conn().await?;
        let raw: Option<String> = conn.get(keys::products()).await?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn set_products(&self, products: &[Product]) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        let payload = serde_json::to_string(products)?;
        conn.set::<_, _, ()>(keys::products(), payload).await?;
        info!(count = products.len(), "Cached products list");
        Ok(())
    }

    async fn clear_products(&self) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        conn.del::<_, ()>(keys::products()).await?;
        Ok(())
    }

    async fn get_description(&self, product_id: &str) -> StoreResult<Option<Description>> {
        let mut conn = self.conn().await?;
        let raw: Option<String> = conn.get(keys::description(product_id)).await?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn set_description(&self, description: &Description) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        let payload = serde_json::to_string(description)?;
        conn.set::<_, _, ()>(keys::description(&description.product_id), payload)
            .await?;
        Ok(())
    }

    async fn delete_description(&self, product_id: &str) -> StoreResult<bool> {
        let mut conn = self.conn().await?;
        let removed: i64 = conn.del(keys::description(product_id)).await?;
        Ok(removed > 0)
    }

    async fn clear_descriptions(&self) -> StoreResult<u64> {
        let found = self.scan_keys(&keys::description_pattern()).await?;
        if found.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn().await?;
        let removed: i64 = conn.del(&found).await?;
        debug!(removed, "Cleared cached descriptions");
        Ok(removed.max(0) as u64)
    }

    async fn mark_processed(&self, product_id: &str) -> StoreResult<bool> {
        let mut conn = self.conn().await?;
        let added: i64 = conn.sadd(keys::processed(), product_id).await?;
        Ok(added > 0)
    }

    async fn is_processed(&self, product_id: &str) -> StoreResult<bool> {
        let mut conn = self.conn().await?;
        Ok(conn.sismember(keys::processed(), product_id).await?)
    }

    async fn processed_ids(&self) -> StoreResult<Vec<String>> {
        let mut conn = self.conn().await?;
        let mut ids: Vec<String> = conn.smembers(keys::processed()).await?;
        ids.sort();
        Ok(ids)
    }

    async fn clear_processed(&self) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        conn.del::<_, ()>(keys::processed()).await?;
        Ok(())
    }

    async fn register_video(&self, meta: &ArtifactMeta) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        let fields = video_to_fields(meta);
        redis::pipe()
            .atomic()
            .hset_multiple(keys::video(meta.id.as_str()), &fields)
            .ignore()
            .sadd(keys::videos(), meta.id.as_str())
            .ignore()
            .query_async::<()>(&mut conn)
            .await?;
        info!(video_id = %meta.id, product_id = %meta.product_id, "Registered video");
        Ok(())
    }

    async fn get_video(&self, video_id: &str) -> StoreResult<Option<ArtifactMeta>> {
        let mut conn = self.conn().await?;
        let key = keys::video(video_id);
        let fields: HashMap<String, String> = conn.hgetall(&key).await?;
        if fields.is_empty() {
            return Ok(None);
        }
        video_from_fields(&key, fields).map(Some)
    }

    async fn list_videos(&self) -> StoreResult<Vec<ArtifactMeta>> {
        let ids: Vec<String> = {
            let mut conn = self.conn().await?;
            conn.smembers(keys::videos()).await?
        };
        let mut videos = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(meta) = self.get_video(&id).await? {
                videos.push(meta);
            }
        }
        videos.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(videos)
    }

    async fn delete_video(&self, video_id: &str) -> StoreResult<bool> {
        let mut conn = self.conn().await?;
        let (removed, _): (i64, i64) = redis::pipe()
            .atomic()
            .srem(keys::videos(), video_id)
            .del(keys::video(video_id))
            .query_async(&mut conn)
            .await?;
        Ok(removed > 0)
    }

    async fn clear_videos(&self) -> StoreResult<u64> {
        let ids: Vec<String> = {
            let mut conn = self.conn().await?;
            conn.smembers(keys::videos()).await?
        };
        let mut conn = self.conn().await?;
        let mut doomed: Vec<String> = ids.iter().map(|id| keys::video(id)).collect();
        doomed.push(keys::videos());
        conn.del::<_, ()>(&doomed).await?;
        Ok(ids.len() as u64)
    }

    async fn list_schedules(&self) -> StoreResult<Vec<Schedule>> {
        let mut conn = self.conn().await?;
        let raw: Vec<String> = conn.lrange(keys::schedules(), 0, -1).await?;
        raw.iter()
            .map(|json| serde_json::from_str(json).map_err(StoreError::from))
            .collect()
    }

    async fn add_schedule(&self, schedule: &Schedule) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        let payload = serde_json::to_string(schedule)?;
        conn.rpush::<_, _, ()>(keys::schedules(), payload).await?;
        info!(schedule_id = %schedule.id, "Stored schedule");
        Ok(())
    }

    async fn update_schedule(&self, schedule: &Schedule) -> StoreResult<bool> {
        let schedules = self.list_schedules().await?;
        let Some(index) = schedules.iter().position(|s| s.id == schedule.id) else {
            return Ok(false);
        };
        let mut conn = self.conn().await?;
        let payload = serde_json::to_string(schedule)?;
        conn.lset::<_, _, ()>(keys::schedules(), index as isize, payload)
            .await?;
        Ok(true)
    }

    async fn try_acquire_lock(&self, name: &str, ttl: Duration) -> StoreResult<bool> {
        let mut conn = self.conn().await?;
        // SET NX EX is a single atomic test-and-set
        let reply: Option<String> = redis::cmd("SET")
            .arg(keys::lock(name))
            .arg(&self.holder_id)
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await?;
        Ok(reply.is_some())
    }

    async fn release_lock(&self, name: &str) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        let _: i64 = redis::Script::new(RELEASE_LOCK_SCRIPT)
            .key(keys::lock(name))
            .arg(&self.holder_id)
            .invoke_async(&mut conn)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use promo_models::{CardTemplate, ColorScheme};

    fn meta() -> ArtifactMeta {
        ArtifactMeta {
            id: ArtifactId::from_string("vid-1"),
            product_id: "p1".to_string(),
            format: ArtifactFormat::Mp4,
            template: CardTemplate::Bold,
            color_scheme: ColorScheme::Dark,
            created_at: Utc::now(),
            size_bytes: 2048,
            url: Some("https://blob/x.mp4".to_string()),
            file_name: None,
        }
    }

    #[test]
    fn test_video_hash_fields_roundtrip() {
        let original = meta();
        let fields: HashMap<String, String> = video_to_fields(&original)
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        assert_eq!(fields.get("template").map(String::as_str), Some("bold"));

        let parsed = video_from_fields("k", fields).unwrap();
        assert_eq!(parsed.id, original.id);
        assert_eq!(parsed.format, ArtifactFormat::Mp4);
        assert_eq!(parsed.color_scheme, ColorScheme::Dark);
        assert_eq!(parsed.url, original.url);
        assert_eq!(parsed.created_at.timestamp(), original.created_at.timestamp());
    }

    #[test]
    fn test_video_missing_field_is_corrupt() {
        let err = video_from_fields("k", HashMap::new()).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[tokio::test]
    #[ignore = "requires Redis"]
    async fn test_redis_processed_is_idempotent() {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        let store = RedisStore::new(&url).unwrap();
        store.clear_processed().await.unwrap();
        assert!(store.mark_processed("p1").await.unwrap());
        assert!(!store.mark_processed("p1").await.unwrap());
        assert_eq!(store.processed_ids().await.unwrap(), vec!["p1".to_string()]);
        store.clear_processed().await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires Redis"]
    async fn test_redis_lock_is_exclusive() {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        let a = RedisStore::new(&url).unwrap();
        let b = RedisStore::new(&url).unwrap();
        a.release_lock("test").await.unwrap();
        assert!(a.try_acquire_lock("test", Duration::from_secs(5)).await.unwrap());
        assert!(!b.try_acquire_lock("test", Duration::from_secs(5)).await.unwrap());
        // b cannot release a's lock
        b.release_lock("test").await.unwrap();
        assert!(!b.try_acquire_lock("test", Duration::from_secs(5)).await.unwrap());
        a.release_lock("test").await.unwrap();
        assert!(b.try_acquire_lock("test", Duration::from_secs(5)).await.unwrap());
        b.release_lock("test").await.unwrap();
    }
}
