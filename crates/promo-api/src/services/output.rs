//! Local output directory for generated files.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use promo_models::is_safe_file_name;

use crate::error::{ApiError, ApiResult};

/// Generated files served by `/api/download`.
#[derive(Debug, Clone)]
pub struct LocalOutput {
    dir: PathBuf,
}

impl LocalOutput {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Download route URL for a file in this directory.
    pub fn download_url(&self, file_name: &str) -> String {
        format!("/api/download?file={}", file_name)
    }

    /// Map a client-supplied name to a path inside the directory.
    ///
    /// Names with separators or traversal sequences are rejected.
    pub fn resolve(&self, file_name: &str) -> ApiResult<PathBuf> {
        if !is_safe_file_name(file_name) {
            return Err(ApiError::bad_request("Invalid file name"));
        }
        Ok(self.dir.join(file_name))
    }

    pub async fn write(&self, file_name: &str, bytes: &[u8]) -> ApiResult<PathBuf> {
        let path = self.resolve(file_name)?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to create output dir: {}", e)))?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to write {}: {}", file_name, e)))?;
        debug!(path = %path.display(), bytes = bytes.len(), "Wrote output file");
        Ok(path)
    }

    /// Read a file; absent files are `NotFound`.
    pub async fn read(&self, file_name: &str) -> ApiResult<Vec<u8>> {
        let path = self.resolve(file_name)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(ApiError::not_found(format!("File not found: {}", file_name)))
            }
            Err(e) => Err(ApiError::internal(format!("Failed to read {}: {}", file_name, e))),
        }
    }

    /// Remove a file. Returns `false` when it did not exist.
    pub async fn remove(&self, file_name: &str) -> ApiResult<bool> {
        let path = self.resolve(file_name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(ApiError::internal(format!("Failed to remove {}: {}", file_name, e))),
        }
    }

    /// Delete every regular file in the directory.
    pub async fn clear(&self) -> ApiResult<u64> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(ApiError::internal(format!("Failed to list output dir: {}", e))),
        };

        let mut removed = 0;
        while let Ok(Some(entry)) = entries.next_entry().await {
            let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
            if !is_file {
                continue;
            }
            match tokio::fs::remove_file(entry.path()).await {
                Ok(()) => removed += 1,
                Err(e) => warn!(path = %entry.path().display(), error = %e, "Failed to remove output file"),
            }
        }
        Ok(removed)
    }
}
