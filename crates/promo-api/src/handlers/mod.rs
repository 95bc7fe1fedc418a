//! Request handlers.

pub mod cards;
pub mod cleanup;
pub mod cron;
pub mod descriptions;
pub mod download;
pub mod health;
pub mod processed;
pub mod products;
pub mod schedules;
pub mod videos;

pub use health::*;

use axum::extract::rejection::JsonRejection;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Serialize;

use promo_models::{Artifact, ArtifactMeta};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Unwrap a JSON body, turning extractor failures into a 400 with the
/// `{success:false}` shape instead of axum's plain-text rejection.
pub(crate) fn json_body<T: DeserializeOwned>(body: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ApiError::bad_request(format!("Invalid request body: {}", rejection.body_text())))
}

/// `Content-Disposition` value with a header-safe file name.
pub(crate) fn attachment(file_name: &str) -> String {
    let safe: String = file_name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .collect();
    let safe = if safe.is_empty() { "download".to_string() } else { safe };
    format!("attachment; filename=\"{}\"", safe)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ArtifactJson {
    success: bool,
    artifact: ArtifactMeta,
    #[serde(skip_serializing_if = "Option::is_none")]
    data_url: Option<String>,
}

/// Respond with a generated artifact.
///
/// - `persist`: store it and answer with its metadata and URL
/// - `inline`: answer with a base64 `data:` URL (combinable with `persist`)
/// - neither: the raw bytes as an attachment
pub(crate) async fn artifact_response(
    state: &AppState,
    artifact: Artifact,
    persist: bool,
    inline: bool,
) -> ApiResult<Response> {
    if !persist && !inline {
        let file_name = artifact
            .meta
            .file_name
            .clone()
            .unwrap_or_else(|| artifact.meta.suggested_file_name());
        return Ok((
            [
                (header::CONTENT_TYPE, artifact.content_type().to_string()),
                (header::CONTENT_DISPOSITION, attachment(&file_name)),
            ],
            artifact.bytes,
        )
            .into_response());
    }

    let meta = if persist {
        state.cards.persist(&artifact).await?
    } else {
        artifact.meta.clone()
    };
    let data_url = inline.then(|| {
        format!(
            "data:{};base64,{}",
            artifact.content_type().split(';').next().unwrap_or_default(),
            STANDARD.encode(&artifact.bytes)
        )
    });

    Ok(Json(ArtifactJson {
        success: true,
        artifact: meta,
        data_url,
    })
    .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attachment_strips_unsafe_characters() {
        assert_eq!(attachment("card_1.png"), "attachment; filename=\"card_1.png\"");
        assert_eq!(attachment("a\"b\r\n.txt"), "attachment; filename=\"ab.txt\"");
        assert_eq!(attachment("\"\""), "attachment; filename=\"download\"");
    }
}
