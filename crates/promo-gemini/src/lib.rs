//! Gemini text generation for product descriptions.
//!
//! The [`TextGenerator`] trait is the seam the orchestrator depends on;
//! [`GeminiClient`] is the production implementation.

pub mod client;
pub mod error;
pub mod prompt;

pub use client::{GeminiClient, GeminiConfig, TextGenerator};
pub use error::{GeminiError, GeminiResult};
pub use prompt::build_description_prompt;
