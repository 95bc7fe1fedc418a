//! Product image download for video frames.

use std::path::{Path, PathBuf};

use futures_util::future::join_all;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// Download up to `max` images into `dir`, in order.
///
/// Individual failures are logged and skipped; the call fails only when no
/// image could be fetched.
pub async fn download_images(
    client: &reqwest::Client,
    urls: &[String],
    dir: &Path,
    max: usize,
    max_bytes: usize,
) -> MediaResult<Vec<PathBuf>> {
    let wanted: Vec<&String> = urls.iter().filter(|u| !u.is_empty()).take(max).collect();
    if wanted.is_empty() {
        return Err(MediaError::invalid_input("product has no images"));
    }

    let downloads = wanted.iter().enumerate().map(|(index, url)| async move {
        let path = dir.join(format!("image_{:02}.{}", index, extension_for(url)));
        match fetch_one(client, url, &path, max_bytes).await {
            Ok(()) => Some(path),
            Err(e) => {
                warn!(url = %url, error = %e, "Skipping product image");
                None
            }
        }
    });

    let paths: Vec<PathBuf> = join_all(downloads).await.into_iter().flatten().collect();

    if paths.is_empty() {
        return Err(MediaError::download_failed(format!(
            "none of {} product images could be downloaded",
            wanted.len()
        )));
    }

    debug!(count = paths.len(), "Downloaded product images");
    Ok(paths)
}

async fn fetch_one(client: &reqwest::Client, url: &str, path: &Path, max_bytes: usize) -> MediaResult<()> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| MediaError::download_failed(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(MediaError::download_failed(format!("HTTP {}", status)));
    }

    if let Some(content_type) = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
    {
        if !content_type.starts_with("image/") && !content_type.starts_with("application/octet-stream") {
            return Err(MediaError::download_failed(format!(
                "unexpected content type {}",
                content_type
            )));
        }
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| MediaError::download_failed(e.to_string()))?;
    if bytes.is_empty() {
        return Err(MediaError::download_failed("empty image body"));
    }
    if bytes.len() > max_bytes {
        return Err(MediaError::download_failed(format!(
            "image is {} bytes, limit is {}",
            bytes.len(),
            max_bytes
        )));
    }

    tokio::fs::write(path, &bytes).await?;
    Ok(())
}

fn extension_for(url: &str) -> &'static str {
    let path = url.split(['?', '#']).next().unwrap_or(url).to_lowercase();
    if path.ends_with(".png") {
        "png"
    } else if path.ends_with(".webp") {
        "webp"
    } else {
        "jpg"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_download_skips_failures_and_keeps_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a.png"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/png")
                    .set_body_bytes(vec![1u8, 2, 3]),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/missing.jpg"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/c.jpg"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/jpeg")
                    .set_body_bytes(vec![9u8; 4]),
            )
            .mount(&server)
            .await;

        let dir = tempfile::TempDir::new().unwrap();
        let urls = vec![
            format!("{}/a.png", server.uri()),
            format!("{}/missing.jpg", server.uri()),
            format!("{}/c.jpg", server.uri()),
        ];
        let paths = download_images(&reqwest::Client::new(), &urls, dir.path(), 5, 1024)
            .await
            .unwrap();

        assert_eq!(paths.len(), 2);
        assert!(paths[0].ends_with("image_00.png"));
        assert!(paths[1].ends_with("image_02.jpg"));
    }

    #[tokio::test]
    async fn test_download_rejects_non_images_and_oversize() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_string("<html></html>"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/big.jpg"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/jpeg")
                    .set_body_bytes(vec![0u8; 64]),
            )
            .mount(&server)
            .await;

        let dir = tempfile::TempDir::new().unwrap();
        let urls = vec![format!("{}/page", server.uri()), format!("{}/big.jpg", server.uri())];
        let err = download_images(&reqwest::Client::new(), &urls, dir.path(), 5, 16)
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::DownloadFailed { .. }));
    }

    #[tokio::test]
    async fn test_no_urls_is_invalid_input() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = download_images(&reqwest::Client::new(), &[String::new()], dir.path(), 5, 16)
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::InvalidInput(_)));
    }

    #[test]
    fn test_extension_for() {
        assert_eq!(extension_for("https://x/a.PNG?w=1"), "png");
        assert_eq!(extension_for("https://cf.shopee.vn/file/abc"), "jpg");
    }
}
