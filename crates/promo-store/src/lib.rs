//! Cache/store adapter.
//!
//! This crate provides:
//! - The [`CacheStore`] trait over the fixed key namespace in [`promo_models::keys`]
//! - [`RedisStore`] for Redis / Upstash KV deployments
//! - [`FileStore`] for local development (JSON files under `database/`)
//! - Sample-data degradation when nothing has been stored yet

pub mod config;
pub mod error;
pub mod file;
pub mod redis_store;
pub mod store;

pub use config::{open_store, open_store_from_env, StoreConfig};
pub use error::{StoreError, StoreResult};
pub use file::FileStore;
pub use redis_store::RedisStore;
pub use store::{CacheStore, ProductSource, ProductsWithSource};
