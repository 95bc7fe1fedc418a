//! Downloads of locally generated files.

use std::collections::HashSet;
use std::io::{Cursor, Write};

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::info;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use promo_models::ArtifactFormat;

use crate::error::{ApiError, ApiResult};
use crate::handlers::attachment;
use crate::state::AppState;

/// Upper bound on files per archive.
const MAX_ZIP_FILES: usize = 50;

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub file: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ZipQuery {
    /// Comma-separated file names
    pub files: Option<String>,
}

/// One generated file as an attachment.
pub async fn download_file(
    State(state): State<AppState>,
    Query(query): Query<DownloadQuery>,
) -> ApiResult<Response> {
    let file_name = query
        .file
        .filter(|f| !f.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing file parameter"))?;

    let bytes = state.output.read(&file_name).await?;
    let content_type = ArtifactFormat::from_file_name(&file_name)
        .map(|f| f.content_type())
        .unwrap_or("application/octet-stream");

    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, attachment(&file_name)),
        ],
        bytes,
    )
        .into_response())
}

/// Several generated files as one ZIP archive.
pub async fn download_zip(
    State(state): State<AppState>,
    Query(query): Query<ZipQuery>,
) -> ApiResult<Response> {
    // Archive entry names must be unique; repeats collapse to the first
    let mut seen = HashSet::new();
    let names: Vec<String> = query
        .files
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && seen.insert(s.clone()))
        .collect();
    if names.is_empty() {
        return Err(ApiError::bad_request("Missing files parameter"));
    }
    if names.len() > MAX_ZIP_FILES {
        return Err(ApiError::bad_request(format!(
            "At most {} files per archive",
            MAX_ZIP_FILES
        )));
    }

    let mut entries = Vec::with_capacity(names.len());
    for name in names {
        let bytes = state.output.read(&name).await?;
        entries.push((name, bytes));
    }

    let count = entries.len();
    let archive = tokio::task::spawn_blocking(move || build_zip(entries))
        .await
        .map_err(|e| ApiError::internal(format!("ZIP task failed: {}", e)))??;
    info!(files = count, bytes = archive.len(), "Built download archive");

    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (header::CONTENT_DISPOSITION, attachment("promo-cards.zip")),
        ],
        archive,
    )
        .into_response())
}

fn build_zip(entries: Vec<(String, Vec<u8>)>) -> ApiResult<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    {
        let mut zip = ZipWriter::new(&mut buf);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for (name, bytes) in entries {
            zip.start_file(name, options)
                .map_err(|e| ApiError::internal(e.to_string()))?;
            zip.write_all(&bytes)
                .map_err(|e| ApiError::internal(e.to_string()))?;
        }

        zip.finish().map_err(|e| ApiError::internal(e.to_string()))?;
    }
    Ok(buf.into_inner())
}
