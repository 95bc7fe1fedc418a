//! Blob storage for persisted artifacts.
//!
//! Artifacts are stored under a configurable prefix:
//! ```text
//! {prefix}/cards/{file_name}
//! {prefix}/videos/{file_name}
//! ```

pub mod client;
pub mod error;

pub use client::{BlobConfig, BlobStore, StoredObject};
pub use error::{StorageError, StorageResult};
