//! Shared data models for the promo card service.
//!
//! This crate provides Serde-serializable types for:
//! - Shopee affiliate products and media descriptors
//! - Generated descriptions and the deterministic fallback text
//! - Card/video rendering options and artifact metadata
//! - Schedules consumed by the cron-triggered generator
//! - The fixed cache key namespace

pub mod artifact;
pub mod card;
pub mod description;
pub mod encoding;
pub mod keys;
pub mod product;
pub mod sample;
pub mod schedule;
pub mod utils;

// Re-export common types
pub use artifact::{Artifact, ArtifactFormat, ArtifactId, ArtifactMeta};
pub use card::{is_hex_color, CardOptions, CardTemplate, ColorScheme, Palette, VideoOptions};
pub use description::{
    fallback_description, Description, DescriptionLength, DescriptionOptions, DescriptionSource,
    Tone,
};
pub use product::{Product, ProductMedia, ProductQuery, SortType};
pub use sample::sample_products;
pub use schedule::{Frequency, Schedule, ScheduleOptions, ScheduleStatus};
pub use utils::{format_bytes, format_price, is_safe_file_name, ParseEnumError};
