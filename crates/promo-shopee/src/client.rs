//! Affiliate API HTTP client.

use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use promo_models::{Product, ProductMedia, ProductQuery};

use crate::error::{ShopeeError, ShopeeResult};
use crate::types::{GraphqlRequest, GraphqlResponse, ItemResponse, PageInfo, ProductOfferData};

const DEFAULT_API_URL: &str = "https://open-api.affiliate.shopee.vn/graphql";
const DEFAULT_ITEM_API_URL: &str = "https://shopee.vn/api/v4/item/get";
const DEFAULT_IMAGE_CDN: &str = "https://cf.shopee.vn/file";

const OFFER_FIELDS: &str = "itemId productName price priceMin priceMax priceDiscountRate \
    sales ratingStar imageUrl offerLink productLink shopId shopName productCatIds";

/// Configuration for the affiliate client.
#[derive(Debug, Clone)]
pub struct ShopeeConfig {
    pub app_id: String,
    pub app_secret: String,
    /// GraphQL endpoint
    pub api_url: String,
    /// Public item endpoint used for media lookup
    pub item_api_url: String,
    /// CDN base for image hashes
    pub image_cdn: String,
    pub timeout: Duration,
}

impl ShopeeConfig {
    /// Create config from environment variables.
    pub fn from_env() -> ShopeeResult<Self> {
        let app_id = std::env::var("SHOPEE_APP_ID")
            .ok()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ShopeeError::not_configured("SHOPEE_APP_ID not set"))?;
        let app_secret = std::env::var("SHOPEE_APP_SECRET")
            .ok()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ShopeeError::not_configured("SHOPEE_APP_SECRET not set"))?;

        Ok(Self {
            app_id,
            app_secret,
            api_url: std::env::var("SHOPEE_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            item_api_url: std::env::var("SHOPEE_ITEM_API_URL")
                .unwrap_or_else(|_| DEFAULT_ITEM_API_URL.to_string()),
            image_cdn: std::env::var("SHOPEE_IMAGE_CDN")
                .unwrap_or_else(|_| DEFAULT_IMAGE_CDN.to_string()),
            timeout: Duration::from_secs(
                std::env::var("SHOPEE_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(20),
            ),
        })
    }

    /// Config with explicit credentials and default endpoints.
    pub fn new(app_id: impl Into<String>, app_secret: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            app_secret: app_secret.into(),
            api_url: DEFAULT_API_URL.to_string(),
            item_api_url: DEFAULT_ITEM_API_URL.to_string(),
            image_cdn: DEFAULT_IMAGE_CDN.to_string(),
            timeout: Duration::from_secs(20),
        }
    }
}

/// A page of search results.
#[derive(Debug, Clone)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub page_info: PageInfo,
}

/// Shopee affiliate API client.
pub struct ShopeeClient {
    http: Client,
    config: ShopeeConfig,
}

impl ShopeeClient {
    pub fn new(config: ShopeeConfig) -> ShopeeResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(ShopeeError::Network)?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> ShopeeResult<Self> {
        Self::new(ShopeeConfig::from_env()?)
    }

    pub fn config(&self) -> &ShopeeConfig {
        &self.config
    }

    /// `Authorization` header value for a payload signed at `timestamp`.
    pub fn authorization(&self, timestamp: i64, payload: &str) -> String {
        let signature = sign(&self.config.app_id, timestamp, payload, &self.config.app_secret);
        format!(
            "SHA256 Credential={}, Timestamp={}, Signature={}",
            self.config.app_id, timestamp, signature
        )
    }

    /// Search product offers.
    pub async fn search_products(&self, query: &ProductQuery) -> ShopeeResult<ProductPage> {
        let gql = build_search_query(query);
        let data: ProductOfferData = self.graphql(gql).await?;

        let fetched_at = Utc::now();
        let products: Vec<Product> = data
            .product_offer_v2
            .nodes
            .into_iter()
            .map(|n| n.into_product(fetched_at))
            .collect();

        if products.is_empty() {
            return Err(ShopeeError::no_data(format!(
                "product offers (keyword: {})",
                query.keyword.as_deref().unwrap_or("")
            )));
        }

        info!(
            keyword = query.keyword.as_deref().unwrap_or(""),
            count = products.len(),
            "Fetched Shopee product offers"
        );

        Ok(ProductPage {
            products,
            page_info: data.product_offer_v2.page_info.unwrap_or_default(),
        })
    }

    /// Look up a single offer by item ID.
    pub async fn get_product(&self, item_id: &str) -> ShopeeResult<Product> {
        let gql = format!(
            "{{ productOfferV2(itemId: {}, limit: 1) {{ nodes {{ {} }} }} }}",
            graphql_id(item_id)?,
            OFFER_FIELDS
        );
        let data: ProductOfferData = self.graphql(gql).await?;
        data.product_offer_v2
            .nodes
            .into_iter()
            .next()
            .map(|n| n.into_product(Utc::now()))
            .ok_or_else(|| ShopeeError::no_data(format!("item {}", item_id)))
    }

    /// Fetch images and videos for one item.
    pub async fn get_product_media(&self, item_id: &str, shop_id: &str) -> ShopeeResult<ProductMedia> {
        debug!(item_id, shop_id, "Fetching Shopee item media");

        let response = self
            .http
            .get(&self.config.item_api_url)
            .query(&[("itemid", item_id), ("shopid", shop_id)])
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ShopeeError::RequestFailed(format!(
                "Item API returned {}: {}",
                status, body
            )));
        }

        let item: ItemResponse = response.json().await?;
        if let Some(code) = item.error.filter(|c| *c != 0) {
            return Err(ShopeeError::Api {
                code,
                message: format!("item lookup failed for {}", item_id),
            });
        }

        let media = item
            .data
            .ok_or_else(|| ShopeeError::no_data(format!("media for item {}", item_id)))?
            .into_media(item_id, &self.config.image_cdn);

        if media.images.is_empty() && media.videos.is_empty() {
            return Err(ShopeeError::no_data(format!("media for item {}", item_id)));
        }

        Ok(media)
    }

    /// Execute a signed GraphQL query. Single attempt.
    async fn graphql<T>(&self, query: String) -> ShopeeResult<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let payload = serde_json::to_string(&GraphqlRequest { query })?;
        let timestamp = Utc::now().timestamp();

        let response = self
            .http
            .post(&self.config.api_url)
            .header("Content-Type", "application/json")
            .header("Authorization", self.authorization(timestamp, &payload))
            .body(payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ShopeeError::RequestFailed(format!(
                "Shopee API returned {}: {}",
                status, body
            )));
        }

        let envelope: GraphqlResponse<T> = response.json().await?;

        if let Some(err) = envelope.errors.into_iter().next() {
            let (code, message) = match err.extensions {
                Some(ext) => (ext.code, ext.message.unwrap_or(err.message)),
                None => (0, err.message),
            };
            warn!(code, message = %message, "Shopee GraphQL error");
            return Err(ShopeeError::Api { code, message });
        }

        envelope
            .data
            .ok_or_else(|| ShopeeError::InvalidResponse("response has no data".to_string()))
    }
}

/// `hex(sha256(app_id + timestamp + payload + secret))`.
pub fn sign(app_id: &str, timestamp: i64, payload: &str, secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(app_id.as_bytes());
    hasher.update(timestamp.to_string().as_bytes());
    hasher.update(payload.as_bytes());
    hasher.update(secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn build_search_query(query: &ProductQuery) -> String {
    let mut args = Vec::new();
    if let Some(keyword) = query.keyword.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
        // JSON string escaping is valid GraphQL string escaping
        let quoted = serde_json::to_string(keyword).unwrap_or_else(|_| "\"\"".to_string());
        args.push(format!("keyword: {}", quoted));
    }
    if let Some(shop_id) = query.shop_id.as_deref().filter(|s| s.chars().all(|c| c.is_ascii_digit()) && !s.is_empty()) {
        args.push(format!("shopId: {}", shop_id));
    }
    args.push(format!("sortType: {}", query.sort_type.api_code()));
    args.push(format!("page: {}", query.page.max(1)));
    args.push(format!("limit: {}", query.limit.clamp(1, 50)));

    format!(
        "{{ productOfferV2({}) {{ nodes {{ {} }} pageInfo {{ page limit hasNextPage }} }} }}",
        args.join(", "),
        OFFER_FIELDS
    )
}

fn graphql_id(item_id: &str) -> ShopeeResult<&str> {
    if !item_id.is_empty() && item_id.chars().all(|c| c.is_ascii_digit()) {
        Ok(item_id)
    } else {
        Err(ShopeeError::no_data(format!("item {}", item_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use promo_models::SortType;
    use wiremock::matchers::{header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> ShopeeClient {
        let mut config = ShopeeConfig::new("app123", "secret");
        config.api_url = format!("{}/graphql", server.uri());
        config.item_api_url = format!("{}/api/v4/item/get", server.uri());
        ShopeeClient::new(config).unwrap()
    }

    #[test]
    fn test_sign_is_stable_hex() {
        let sig = sign("app", 1700000000, "{}", "secret");
        assert_eq!(sig.len(), 64);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(sig, sign("app", 1700000000, "{}", "secret"));
        assert_ne!(sig, sign("app", 1700000001, "{}", "secret"));
    }

    #[test]
    fn test_authorization_header_format() {
        let client = ShopeeClient::new(ShopeeConfig::new("app123", "secret")).unwrap();
        let header = client.authorization(1700000000, "{}");
        assert!(header.starts_with("SHA256 Credential=app123, Timestamp=1700000000, Signature="));
    }

    #[test]
    fn test_search_query_escapes_keyword() {
        let query = ProductQuery {
            keyword: Some("tai \"nghe\"".to_string()),
            sort_type: SortType::ItemSold,
            ..Default::default()
        };
        let gql = build_search_query(&query);
        assert!(gql.contains(r#"keyword: "tai \"nghe\"""#));
        assert!(gql.contains("sortType: 2"));
        assert!(gql.contains("limit: 20"));
    }

    #[test]
    fn test_search_query_drops_non_numeric_shop() {
        let query = ProductQuery {
            shop_id: Some("1 } evil".to_string()),
            ..Default::default()
        };
        assert!(!build_search_query(&query).contains("shopId"));
    }

    #[tokio::test]
    async fn test_search_products_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .and(header_exists("Authorization"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {
                    "productOfferV2": {
                        "nodes": [{
                            "itemId": 111,
                            "productName": "Tai nghe",
                            "price": "65000",
                            "priceDiscountRate": 35,
                            "imageUrl": "https://cf.shopee.vn/file/a",
                            "offerLink": "https://s.shopee.vn/a"
                        }],
                        "pageInfo": {"page": 1, "limit": 20, "hasNextPage": true}
                    }
                }
            })))
            .mount(&server)
            .await;

        let page = client_for(&server)
            .search_products(&ProductQuery::keyword("tai nghe"))
            .await
            .unwrap();

        assert_eq!(page.products.len(), 1);
        assert_eq!(page.products[0].item_id, "111");
        assert!(page.page_info.has_next_page);
    }

    #[tokio::test]
    async fn test_search_products_graphql_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": null,
                "errors": [{"message": "error", "extensions": {"code": 10020, "message": "Invalid Signature"}}]
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .search_products(&ProductQuery::default())
            .await
            .unwrap_err();

        match err {
            ShopeeError::Api { code, message } => {
                assert_eq!(code, 10020);
                assert_eq!(message, "Invalid Signature");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_search_products_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .search_products(&ProductQuery::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ShopeeError::RequestFailed(_)));
    }

    #[tokio::test]
    async fn test_get_product_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {"productOfferV2": {"nodes": []}}
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).get_product("123").await.unwrap_err();
        assert!(matches!(err, ShopeeError::NoData(_)));

        let err = client_for(&server).get_product("abc").await.unwrap_err();
        assert!(matches!(err, ShopeeError::NoData(_)));
    }

    #[tokio::test]
    async fn test_search_products_empty_is_no_data() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {"productOfferV2": {"nodes": []}}
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .search_products(&ProductQuery::keyword("khong co"))
            .await
            .unwrap_err();
        assert!(matches!(err, ShopeeError::NoData(_)));
    }

    #[tokio::test]
    async fn test_get_product_media() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v4/item/get"))
            .and(query_param("itemid", "111"))
            .and(query_param("shopid", "9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error": null,
                "data": {"images": ["h1", "h2"], "video_info_list": []}
            })))
            .mount(&server)
            .await;

        let media = client_for(&server).get_product_media("111", "9").await.unwrap();
        assert_eq!(media.images.len(), 2);
        assert!(media.images[0].ends_with("/h1"));
        assert!(media.videos.is_empty());
    }

    #[tokio::test]
    async fn test_get_product_media_no_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error": 4, "data": null
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).get_product_media("111", "9").await.unwrap_err();
        assert!(matches!(err, ShopeeError::Api { code: 4, .. }));
    }
}
