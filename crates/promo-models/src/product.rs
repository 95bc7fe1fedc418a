//! Shopee affiliate product models.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use crate::utils::{format_price, ParseEnumError};

/// A product offer returned by the affiliate API or read back from cache.
///
/// Products are replaced wholesale on every refresh; nothing mutates one in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Shopee item identifier
    pub item_id: String,
    /// Display name
    pub name: String,
    /// Current price
    pub price: f64,
    /// Price before discount
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_price: Option<f64>,
    /// Discount percentage (0-100)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_percent: Option<u32>,
    /// Units sold
    #[serde(default)]
    pub sales: u64,
    /// Rating out of 5
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    /// Primary image
    pub image_url: String,
    /// Additional images
    #[serde(default)]
    pub image_urls: Vec<String>,
    /// Affiliate offer (tracking) link
    pub offer_link: String,
    /// Plain product page link
    #[serde(default)]
    pub product_link: String,
    #[serde(default)]
    pub shop_id: String,
    #[serde(default)]
    pub shop_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
    /// When this record was fetched
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Whether the product carries a positive discount.
    pub fn has_discount(&self) -> bool {
        self.discount_percent.map(|d| d > 0).unwrap_or(false)
    }

    /// Badge text such as `-35%`, if discounted.
    pub fn discount_label(&self) -> Option<String> {
        self.discount_percent
            .filter(|d| *d > 0)
            .map(|d| format!("-{}%", d))
    }

    /// Formatted current price (e.g. `₫129.000`).
    pub fn price_label(&self) -> String {
        format_price(self.price)
    }

    /// Formatted original price, when higher than the current price.
    pub fn original_price_label(&self) -> Option<String> {
        self.original_price
            .filter(|p| *p > self.price)
            .map(format_price)
    }

    /// All image URLs, primary first, deduplicated.
    pub fn all_images(&self) -> Vec<String> {
        let mut images = Vec::with_capacity(self.image_urls.len() + 1);
        for url in std::iter::once(&self.image_url).chain(self.image_urls.iter()) {
            if !url.is_empty() && !images.contains(url) {
                images.push(url.clone());
            }
        }
        images
    }

    /// Compute discount percentage from original and current price.
    pub fn compute_discount(price: f64, original_price: f64) -> Option<u32> {
        if original_price <= 0.0 || price >= original_price {
            return None;
        }
        let pct = ((original_price - price) / original_price * 100.0).round();
        Some(pct.clamp(0.0, 100.0) as u32)
    }
}

/// Media descriptor for one product.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductMedia {
    pub item_id: String,
    pub images: Vec<String>,
    pub videos: Vec<String>,
}

/// Sort orders supported by `productOfferV2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortType {
    #[default]
    Relevance,
    ItemSold,
    PriceDesc,
    PriceAsc,
    CommissionDesc,
}

impl SortType {
    /// Numeric code expected by the GraphQL API.
    pub fn api_code(&self) -> u8 {
        match self {
            SortType::Relevance => 1,
            SortType::ItemSold => 2,
            SortType::PriceDesc => 3,
            SortType::PriceAsc => 4,
            SortType::CommissionDesc => 5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortType::Relevance => "relevance",
            SortType::ItemSold => "item_sold",
            SortType::PriceDesc => "price_desc",
            SortType::PriceAsc => "price_asc",
            SortType::CommissionDesc => "commission_desc",
        }
    }
}

impl fmt::Display for SortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SortType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "relevance" | "1" => Ok(SortType::Relevance),
            "item_sold" | "sales" | "2" => Ok(SortType::ItemSold),
            "price_desc" | "3" => Ok(SortType::PriceDesc),
            "price_asc" | "4" => Ok(SortType::PriceAsc),
            "commission_desc" | "5" => Ok(SortType::CommissionDesc),
            _ => Err(ParseEnumError::new("sort type", s)),
        }
    }
}

/// Product search parameters.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    #[serde(default)]
    #[validate(length(max = 200))]
    pub keyword: Option<String>,
    #[serde(default = "default_page")]
    #[validate(range(min = 1, max = 100))]
    pub page: u32,
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 50))]
    pub limit: u32,
    #[serde(default)]
    pub sort_type: SortType,
    #[serde(default)]
    pub shop_id: Option<String>,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    20
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self {
            keyword: None,
            page: default_page(),
            limit: default_limit(),
            sort_type: SortType::default(),
            shop_id: None,
        }
    }
}

impl ProductQuery {
    pub fn keyword(keyword: impl Into<String>) -> Self {
        Self {
            keyword: Some(keyword.into()),
            ..Default::default()
        }
    }
}
