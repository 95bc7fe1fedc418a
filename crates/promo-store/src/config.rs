//! Store selection.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::error::StoreResult;
use crate::file::FileStore;
use crate::redis_store::RedisStore;
use crate::store::CacheStore;

/// Which backend to open and where.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Redis URL; when unset the local file store is used
    pub redis_url: Option<String>,
    /// Directory for the local file store
    pub database_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            database_dir: PathBuf::from("database"),
        }
    }
}

impl StoreConfig {
    /// Read `REDIS_URL` (or `KV_URL`) and `DATABASE_DIR`.
    pub fn from_env() -> Self {
        let redis_url = std::env::var("REDIS_URL")
            .or_else(|_| std::env::var("KV_URL"))
            .ok()
            .filter(|url| !url.trim().is_empty());

        Self {
            redis_url,
            database_dir: std::env::var("DATABASE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("database")),
        }
    }
}

/// Open the configured backend.
pub async fn open_store(config: &StoreConfig) -> StoreResult<Arc<dyn CacheStore>> {
    match &config.redis_url {
        Some(url) => {
            let store = RedisStore::new(url)?;
            info!("Using Redis store");
            Ok(Arc::new(store))
        }
        None => {
            let store = FileStore::open(&config.database_dir).await?;
            Ok(Arc::new(store))
        }
    }
}

pub async fn open_store_from_env() -> StoreResult<Arc<dyn CacheStore>> {
    open_store(&StoreConfig::from_env()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_without_redis_url_opens_file_store() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = StoreConfig {
            redis_url: None,
            database_dir: dir.path().join("db"),
        };
        let store = open_store(&config).await.unwrap();
        assert_eq!(store.backend_name(), "file");
        store.ping().await.unwrap();
    }
}
