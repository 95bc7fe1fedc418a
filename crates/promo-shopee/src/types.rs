//! Raw affiliate API payloads and their normalisation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use promo_models::{Product, ProductMedia};

/// GraphQL request body.
#[derive(Debug, Serialize)]
pub(crate) struct GraphqlRequest {
    pub query: String,
}

/// GraphQL response envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct GraphqlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphqlError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphqlError {
    pub message: String,
    #[serde(default)]
    pub extensions: Option<GraphqlErrorExtensions>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphqlErrorExtensions {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProductOfferData {
    pub product_offer_v2: ProductOfferConnection,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProductOfferConnection {
    #[serde(default)]
    pub nodes: Vec<ProductOfferNode>,
    #[serde(rename = "pageInfo", default)]
    pub page_info: Option<PageInfo>,
}

/// Pagination info.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub has_next_page: bool,
}

/// One offer node as returned by `productOfferV2`. Numeric fields arrive as strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProductOfferNode {
    #[serde(deserialize_with = "string_or_number")]
    pub item_id: String,
    pub product_name: String,
    #[serde(default, deserialize_with = "opt_f64")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "opt_f64")]
    pub price_min: Option<f64>,
    #[serde(default, deserialize_with = "opt_f64")]
    pub price_max: Option<f64>,
    #[serde(default)]
    pub price_discount_rate: Option<u32>,
    #[serde(default)]
    pub sales: Option<u64>,
    #[serde(default, deserialize_with = "opt_f64")]
    pub rating_star: Option<f64>,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub offer_link: String,
    #[serde(default)]
    pub product_link: String,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub shop_id: Option<String>,
    #[serde(default)]
    pub shop_name: Option<String>,
    #[serde(default)]
    pub product_cat_ids: Vec<i64>,
}

impl ProductOfferNode {
    /// Normalise into a [`Product`].
    pub fn into_product(self, fetched_at: DateTime<Utc>) -> Product {
        let price = self.price.or(self.price_min).unwrap_or(0.0);
        let discount = self.price_discount_rate.filter(|d| *d > 0 && *d < 100);

        let original_price = match discount {
            Some(d) => Some((price / (1.0 - d as f64 / 100.0)).round()),
            None => self.price_max.filter(|max| *max > price),
        };
        let discount_percent = discount.or_else(|| {
            original_price.and_then(|orig| Product::compute_discount(price, orig))
        });

        Product {
            item_id: self.item_id,
            name: self.product_name.trim().to_string(),
            price,
            original_price,
            discount_percent,
            sales: self.sales.unwrap_or(0),
            rating: self.rating_star.filter(|r| *r > 0.0),
            image_url: self.image_url,
            image_urls: Vec::new(),
            offer_link: self.offer_link,
            product_link: self.product_link,
            shop_id: self.shop_id.unwrap_or_default(),
            shop_name: self.shop_name.unwrap_or_default(),
            category_id: self.product_cat_ids.last().map(|c| c.to_string()),
            category_name: None,
            updated_at: fetched_at,
        }
    }
}

/// Public item endpoint envelope (`/api/v4/item/get`).
#[derive(Debug, Deserialize)]
pub(crate) struct ItemResponse {
    #[serde(default)]
    pub data: Option<ItemData>,
    #[serde(default)]
    pub error: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ItemData {
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub video_info_list: Vec<VideoInfo>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VideoInfo {
    #[serde(default)]
    pub default_format: Option<VideoFormat>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VideoFormat {
    #[serde(default)]
    pub url: Option<String>,
}

impl ItemData {
    /// Expand image hashes against the CDN base.
    pub fn into_media(self, item_id: &str, image_cdn: &str) -> ProductMedia {
        let images = self
            .images
            .into_iter()
            .filter(|h| !h.is_empty())
            .map(|h| {
                if h.starts_with("http") {
                    h
                } else {
                    format!("{}/{}", image_cdn.trim_end_matches('/'), h)
                }
            })
            .collect();
        let videos = self
            .video_info_list
            .into_iter()
            .filter_map(|v| v.default_format.and_then(|f| f.url))
            .collect();

        ProductMedia {
            item_id: item_id.to_string(),
            images,
            videos,
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("expected string or number, got {}", other))),
    }
}

fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        _ => None,
    })
}
