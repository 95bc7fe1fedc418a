//! Product descriptions and the deterministic fallback text.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::product::Product;
use crate::utils::ParseEnumError;

/// Where a description came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DescriptionSource {
    /// Text-generation API
    Ai,
    /// Local template
    Fallback,
}

impl DescriptionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DescriptionSource::Ai => "ai",
            DescriptionSource::Fallback => "fallback",
        }
    }
}

impl fmt::Display for DescriptionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Free text attached to a product identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Description {
    pub product_id: String,
    pub text: String,
    pub source: DescriptionSource,
    pub created_at: DateTime<Utc>,
}

impl Description {
    pub fn new(product_id: impl Into<String>, text: impl Into<String>, source: DescriptionSource) -> Self {
        Self {
            product_id: product_id.into(),
            text: text.into(),
            source,
            created_at: Utc::now(),
        }
    }
}

/// Writing tone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    #[default]
    Friendly,
    Professional,
    Excited,
    Casual,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Friendly => "friendly",
            Tone::Professional => "professional",
            Tone::Excited => "excited",
            Tone::Casual => "casual",
        }
    }
}

impl FromStr for Tone {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "friendly" => Ok(Tone::Friendly),
            "professional" => Ok(Tone::Professional),
            "excited" => Ok(Tone::Excited),
            "casual" => Ok(Tone::Casual),
            _ => Err(ParseEnumError::new("tone", s)),
        }
    }
}

/// Target description length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum DescriptionLength {
    Short,
    #[default]
    Medium,
    Long,
}

impl DescriptionLength {
    pub fn as_str(&self) -> &'static str {
        match self {
            DescriptionLength::Short => "short",
            DescriptionLength::Medium => "medium",
            DescriptionLength::Long => "long",
        }
    }

    /// Approximate word budget handed to the text generator.
    pub fn word_budget(&self) -> u32 {
        match self {
            DescriptionLength::Short => 40,
            DescriptionLength::Medium => 80,
            DescriptionLength::Long => 150,
        }
    }
}

/// Style options for description generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DescriptionOptions {
    #[serde(default)]
    pub tone: Tone,
    #[serde(default)]
    pub length: DescriptionLength,
    #[serde(default = "default_true")]
    pub include_emoji: bool,
    #[serde(default = "default_true")]
    pub include_hashtags: bool,
    /// BCP-47 language tag for the generated text
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_true() -> bool {
    true
}

fn default_language() -> String {
    "vi".to_string()
}

impl Default for DescriptionOptions {
    fn default() -> Self {
        Self {
            tone: Tone::default(),
            length: DescriptionLength::default(),
            include_emoji: true,
            include_hashtags: true,
            language: default_language(),
        }
    }
}

/// Build the local template description used when text generation fails.
///
/// The output always contains the product name, and the discount percentage
/// when the product is discounted.
pub fn fallback_description(product: &Product, options: &DescriptionOptions) -> String {
    let name = product.name.trim();
    let name = if name.is_empty() { "Sản phẩm" } else { name };
    let mut lines = Vec::new();

    let headline = match product.discount_percent.filter(|d| *d > 0) {
        Some(discount) => format!("{} đang giảm {}%!", name, discount),
        None => format!("{} đang có giá tốt!", name),
    };
    if options.include_emoji {
        lines.push(format!("🔥 {}", headline));
    } else {
        lines.push(headline);
    }

    let mut price_line = format!("Giá chỉ còn {}", product.price_label());
    if let Some(original) = product.original_price_label() {
        price_line.push_str(&format!(" (giá gốc {})", original));
    }
    lines.push(price_line);

    if options.length != DescriptionLength::Short {
        let mut social = Vec::new();
        if product.sales > 0 {
            social.push(format!("đã bán {}", product.sales));
        }
        if let Some(rating) = product.rating.filter(|r| *r > 0.0) {
            social.push(format!("đánh giá {:.1}/5", rating));
        }
        if !social.is_empty() {
            lines.push(format!("Sản phẩm {}.", social.join(", ")));
        }
        if !product.shop_name.is_empty() {
            lines.push(format!("Bán bởi {}.", product.shop_name));
        }
    }

    let cta = if options.include_emoji {
        "👉 Mua ngay tại link bên dưới!"
    } else {
        "Mua ngay tại link bên dưới!"
    };
    lines.push(cta.to_string());

    if options.include_hashtags {
        let mut tags = vec!["#shopee".to_string(), "#deal".to_string()];
        if product.has_discount() {
            tags.push("#giamgia".to_string());
        }
        if let Some(category) = product.category_name.as_deref() {
            let tag: String = category
                .chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
                .to_lowercase();
            if !tag.is_empty() {
                tags.push(format!("#{}", tag));
            }
        }
        lines.push(tags.join(" "));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::sample_products;

    #[test]
    fn test_fallback_contains_name_and_discount() {
        for product in sample_products() {
            let text = fallback_description(&product, &DescriptionOptions::default());
            assert!(!text.is_empty());
            assert!(text.contains(product.name.trim()));
            if let Some(d) = product.discount_percent.filter(|d| *d > 0) {
                assert!(text.contains(&format!("{}%", d)));
            }
        }
    }

    #[test]
    fn test_fallback_without_emoji_or_hashtags() {
        let product = sample_products().remove(0);
        let options = DescriptionOptions {
            include_emoji: false,
            include_hashtags: false,
            ..Default::default()
        };
        let text = fallback_description(&product, &options);
        assert!(!text.contains('#'));
        assert!(!text.contains("🔥"));
    }

    #[test]
    fn test_fallback_empty_name_still_non_empty() {
        let mut product = sample_products().remove(0);
        product.name = "   ".to_string();
        product.discount_percent = None;
        let text = fallback_description(&product, &DescriptionOptions::default());
        assert!(text.contains("Sản phẩm"));
    }

    #[test]
    fn test_short_length_omits_social_proof() {
        let product = sample_products().remove(0);
        let options = DescriptionOptions {
            length: DescriptionLength::Short,
            ..Default::default()
        };
        let text = fallback_description(&product, &options);
        assert!(!text.contains("đã bán"));
    }
}
