//! Card and video rendering options.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::artifact::ArtifactFormat;
use crate::utils::ParseEnumError;

/// HTML template used to lay out a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum CardTemplate {
    /// Image on top, details card below
    #[default]
    Modern,
    /// White space, centered product, small type
    Minimal,
    /// Full-bleed image with large price banner
    Bold,
}

impl CardTemplate {
    pub const ALL: &'static [CardTemplate] =
        &[CardTemplate::Modern, CardTemplate::Minimal, CardTemplate::Bold];

    pub fn as_str(&self) -> &'static str {
        match self {
            CardTemplate::Modern => "modern",
            CardTemplate::Minimal => "minimal",
            CardTemplate::Bold => "bold",
        }
    }
}

impl fmt::Display for CardTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CardTemplate {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "modern" => Ok(CardTemplate::Modern),
            "minimal" => Ok(CardTemplate::Minimal),
            "bold" => Ok(CardTemplate::Bold),
            _ => Err(ParseEnumError::new("template", s)),
        }
    }
}

/// Colour palette applied to a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum ColorScheme {
    #[default]
    Shopee,
    Dark,
    Light,
    Pastel,
}

/// Resolved colours for a scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: &'static str,
    pub surface: &'static str,
    pub text: &'static str,
    pub muted: &'static str,
    pub accent: &'static str,
}

impl ColorScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColorScheme::Shopee => "shopee",
            ColorScheme::Dark => "dark",
            ColorScheme::Light => "light",
            ColorScheme::Pastel => "pastel",
        }
    }

    pub fn palette(&self) -> Palette {
        match self {
            ColorScheme::Shopee => Palette {
                background: "#fff5f1",
                surface: "#ffffff",
                text: "#222222",
                muted: "#757575",
                accent: "#ee4d2d",
            },
            ColorScheme::Dark => Palette {
                background: "#121212",
                surface: "#1e1e1e",
                text: "#f5f5f5",
                muted: "#a0a0a0",
                accent: "#ff6f3c",
            },
            ColorScheme::Light => Palette {
                background: "#f7f7f7",
                surface: "#ffffff",
                text: "#111111",
                muted: "#666666",
                accent: "#1e88e5",
            },
            ColorScheme::Pastel => Palette {
                background: "#fdf2f8",
                surface: "#ffffff",
                text: "#3f3d56",
                muted: "#8a87a8",
                accent: "#ec4899",
            },
        }
    }
}

impl fmt::Display for ColorScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ColorScheme {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "shopee" | "orange" => Ok(ColorScheme::Shopee),
            "dark" => Ok(ColorScheme::Dark),
            "light" => Ok(ColorScheme::Light),
            "pastel" => Ok(ColorScheme::Pastel),
            _ => Err(ParseEnumError::new("color scheme", s)),
        }
    }
}

/// Options controlling card rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CardOptions {
    #[serde(default)]
    pub template: CardTemplate,
    #[serde(default)]
    pub color_scheme: ColorScheme,
    /// Overrides the scheme accent (`#RGB` or `#RRGGBB`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accent_color: Option<String>,
    #[serde(default = "default_true")]
    pub show_badge: bool,
    #[serde(default = "default_true")]
    pub show_price: bool,
    #[serde(default = "default_true")]
    pub show_description: bool,
    #[serde(default)]
    pub format: ArtifactFormat,
}

fn default_true() -> bool {
    true
}

impl Default for CardOptions {
    fn default() -> Self {
        Self {
            template: CardTemplate::default(),
            color_scheme: ColorScheme::default(),
            accent_color: None,
            show_badge: true,
            show_price: true,
            show_description: true,
            format: ArtifactFormat::default(),
        }
    }
}

impl CardOptions {
    /// Accent colour to use: a valid override, else the scheme accent.
    pub fn resolved_accent(&self) -> String {
        match self.accent_color.as_deref() {
            Some(c) if is_hex_color(c) => c.to_string(),
            _ => self.color_scheme.palette().accent.to_string(),
        }
    }

    /// Validate options, returning a readable message on failure.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(color) = self.accent_color.as_deref() {
            if !is_hex_color(color) {
                return Err(format!("Invalid accent color: {}", color));
            }
        }
        if self.format.is_motion() {
            return Err(format!("Format {} is not a card format", self.format));
        }
        Ok(())
    }
}

/// Whether `s` is `#RGB` or `#RRGGBB`.
pub fn is_hex_color(s: &str) -> bool {
    match s.strip_prefix('#') {
        Some(hex) => (hex.len() == 3 || hex.len() == 6) && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

/// Options controlling video/GIF generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VideoOptions {
    /// Seconds each image stays on screen
    #[serde(default = "default_seconds_per_image")]
    pub seconds_per_image: f64,
    /// Maximum product images to include
    #[serde(default = "default_max_images")]
    pub max_images: usize,
    /// Prepend the rendered card as the first frame
    #[serde(default = "default_true")]
    pub include_card: bool,
    /// `mp4` or `gif`
    #[serde(default = "default_video_format")]
    pub format: ArtifactFormat,
    /// Card options for the first frame
    #[serde(default)]
    pub card: CardOptions,
}

fn default_seconds_per_image() -> f64 {
    2.5
}

fn default_max_images() -> usize {
    5
}

fn default_video_format() -> ArtifactFormat {
    ArtifactFormat::Mp4
}

impl Default for VideoOptions {
    fn default() -> Self {
        Self {
            seconds_per_image: default_seconds_per_image(),
            max_images: default_max_images(),
            include_card: true,
            format: default_video_format(),
            card: CardOptions::default(),
        }
    }
}

impl VideoOptions {
    pub fn validate(&self) -> Result<(), String> {
        if !self.format.is_motion() {
            return Err(format!("Format {} is not a video format", self.format));
        }
        if !(0.5..=10.0).contains(&self.seconds_per_image) {
            return Err("secondsPerImage must be between 0.5 and 10".to_string());
        }
        if self.max_images == 0 || self.max_images > 20 {
            return Err("maxImages must be between 1 and 20".to_string());
        }
        if let Some(color) = self.card.accent_color.as_deref() {
            if !is_hex_color(color) {
                return Err(format!("Invalid accent color: {}", color));
            }
        }
        Ok(())
    }
}
