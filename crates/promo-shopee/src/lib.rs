//! Shopee affiliate Open API client.
//!
//! This crate provides:
//! - Signed GraphQL calls to the affiliate `productOfferV2` endpoint
//! - Normalisation of raw offers into [`promo_models::Product`]
//! - Product media lookup (images and videos) for one item

pub mod client;
pub mod error;
pub mod types;

pub use client::{sign, ProductPage, ShopeeClient, ShopeeConfig};
pub use types::PageInfo;
pub use error::{ShopeeError, ShopeeResult};
