//! Generated artifact models.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::card::{CardTemplate, ColorScheme};
use crate::utils::ParseEnumError;

/// Unique identifier for a generated artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ArtifactId(pub String);

impl ArtifactId {
    /// Generate a new random artifact ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ArtifactId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Output format of a generated artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactFormat {
    #[default]
    Png,
    Jpeg,
    Html,
    Mp4,
    Gif,
}

impl ArtifactFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            ArtifactFormat::Png => "image/png",
            ArtifactFormat::Jpeg => "image/jpeg",
            ArtifactFormat::Html => "text/html; charset=utf-8",
            ArtifactFormat::Mp4 => "video/mp4",
            ArtifactFormat::Gif => "image/gif",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactFormat::Png => "png",
            ArtifactFormat::Jpeg => "jpg",
            ArtifactFormat::Html => "html",
            ArtifactFormat::Mp4 => "mp4",
            ArtifactFormat::Gif => "gif",
        }
    }

    /// Whether this format is a still image rendered from a card.
    pub fn is_image(&self) -> bool {
        matches!(self, ArtifactFormat::Png | ArtifactFormat::Jpeg)
    }

    /// Whether this format goes through the video encoder.
    pub fn is_motion(&self) -> bool {
        matches!(self, ArtifactFormat::Mp4 | ArtifactFormat::Gif)
    }

    /// Guess a format from a file name's extension.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let ext = name.rsplit_once('.')?.1;
        ext.parse().ok()
    }
}

impl fmt::Display for ArtifactFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl FromStr for ArtifactFormat {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "png" => Ok(ArtifactFormat::Png),
            "jpg" | "jpeg" => Ok(ArtifactFormat::Jpeg),
            "html" | "htm" => Ok(ArtifactFormat::Html),
            "mp4" => Ok(ArtifactFormat::Mp4),
            "gif" => Ok(ArtifactFormat::Gif),
            _ => Err(ParseEnumError::new("artifact format", s)),
        }
    }
}

/// Metadata describing a generated artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactMeta {
    pub id: ArtifactId,
    pub product_id: String,
    pub format: ArtifactFormat,
    pub template: CardTemplate,
    pub color_scheme: ColorScheme,
    pub created_at: DateTime<Utc>,
    pub size_bytes: u64,
    /// Public URL once persisted (blob URL or local download path)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Stored file name (local output dir or blob key suffix)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

impl ArtifactMeta {
    /// Download file name, e.g. `card_12345_<id>.png`.
    pub fn suggested_file_name(&self) -> String {
        let kind = if self.format.is_motion() { "video" } else { "card" };
        format!(
            "{}_{}_{}.{}",
            kind,
            sanitize_component(&self.product_id),
            short_id(self.id.as_str()),
            self.format.extension()
        )
    }
}

fn short_id(id: &str) -> String {
    let short: String = id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .take(8)
        .collect();
    if short.is_empty() {
        "0".to_string()
    } else {
        short
    }
}

fn sanitize_component(s: &str) -> String {
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .take(64)
        .collect();
    if cleaned.is_empty() {
        "item".to_string()
    } else {
        cleaned
    }
}

/// A finished artifact: bytes plus metadata.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub bytes: Vec<u8>,
    pub meta: ArtifactMeta,
}

impl Artifact {
    pub fn new(
        product_id: impl Into<String>,
        format: ArtifactFormat,
        template: CardTemplate,
        color_scheme: ColorScheme,
        bytes: Vec<u8>,
    ) -> Self {
        let meta = ArtifactMeta {
            id: ArtifactId::new(),
            product_id: product_id.into(),
            format,
            template,
            color_scheme,
            created_at: Utc::now(),
            size_bytes: bytes.len() as u64,
            url: None,
            file_name: None,
        };
        Self { bytes, meta }
    }

    pub fn content_type(&self) -> &'static str {
        self.meta.format.content_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parse_and_extension() {
        assert_eq!("JPEG".parse::<ArtifactFormat>().unwrap(), ArtifactFormat::Jpeg);
        assert_eq!(ArtifactFormat::Jpeg.extension(), "jpg");
        assert_eq!(ArtifactFormat::from_file_name("a.b.mp4"), Some(ArtifactFormat::Mp4));
        assert_eq!(ArtifactFormat::from_file_name("noext"), None);
    }

    #[test]
    fn test_suggested_file_name_is_safe() {
        let artifact = Artifact::new(
            "../../123",
            ArtifactFormat::Png,
            CardTemplate::Modern,
            ColorScheme::Shopee,
            vec![1, 2, 3],
        );
        let name = artifact.meta.suggested_file_name();
        assert!(name.starts_with("card_123_"));
        assert!(name.ends_with(".png"));
        assert!(crate::utils::is_safe_file_name(&name));
        assert_eq!(artifact.meta.size_bytes, 3);
    }

    #[test]
    fn test_suggested_file_name_with_non_ascii_id() {
        let mut artifact = Artifact::new(
            "123",
            ArtifactFormat::Gif,
            CardTemplate::Modern,
            ColorScheme::Shopee,
            vec![1],
        );
        artifact.meta.id = ArtifactId::from_string("ảnh-đẹp-2024-xyz");
        let name = artifact.meta.suggested_file_name();
        assert_eq!(name, "video_123_nh-p-202.gif");
        assert!(crate::utils::is_safe_file_name(&name));
    }
}
