//! Gemini API client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use promo_models::{DescriptionOptions, Product};

use crate::error::{GeminiError, GeminiResult};
use crate::prompt::build_description_prompt;

const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODELS: &[&str] = &["gemini-2.0-flash", "gemini-1.5-flash"];

/// Generates marketing text for a product.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate_description(
        &self,
        product: &Product,
        options: &DescriptionOptions,
    ) -> GeminiResult<String>;
}

/// Gemini client configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    /// Base URL up to and including the API version
    pub api_url: String,
    /// Models tried in order
    pub models: Vec<String>,
    pub timeout: Duration,
    pub temperature: f32,
}

impl GeminiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> GeminiResult<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or(GeminiError::MissingApiKey)?;

        let models = std::env::var("GEMINI_MODEL")
            .map(|s| {
                s.split(',')
                    .map(|m| m.trim().to_string())
                    .filter(|m| !m.is_empty())
                    .collect::<Vec<_>>()
            })
            .ok()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_MODELS.iter().map(|m| m.to_string()).collect());

        Ok(Self {
            api_key,
            api_url: std::env::var("GEMINI_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            models,
            timeout: Duration::from_secs(
                std::env::var("GEMINI_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            temperature: std::env::var("GEMINI_TEMPERATURE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0.8),
        })
    }

    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_url: DEFAULT_API_URL.to_string(),
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            timeout: Duration::from_secs(30),
            temperature: 0.8,
        }
    }
}

/// Gemini API request.
#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

/// Gemini API response.
#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "promptFeedback", default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct PromptFeedback {
    #[serde(rename = "blockReason", default)]
    block_reason: Option<String>,
}

/// Gemini API client.
pub struct GeminiClient {
    http: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> GeminiResult<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> GeminiResult<Self> {
        Self::new(GeminiConfig::from_env()?)
    }

    /// Generate text for a prompt, trying each configured model in order.
    pub async fn generate_text(&self, prompt: &str, max_output_tokens: u32) -> GeminiResult<String> {
        let mut last_error = None;

        for model in &self.config.models {
            match self.call_model(model, prompt, max_output_tokens).await {
                Ok(text) => {
                    info!(model = %model, chars = text.len(), "Generated text with Gemini");
                    return Ok(text);
                }
                Err(e) => {
                    warn!(model = %model, error = %e, "Gemini model failed");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or(GeminiError::EmptyResponse))
    }

    async fn call_model(&self, model: &str, prompt: &str, max_output_tokens: u32) -> GeminiResult<String> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.api_url.trim_end_matches('/'),
            model
        );

        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
                max_output_tokens,
            },
        };

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.config.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GeminiError::Api { status, body });
        }

        let body = response.text().await?;
        let parsed: GeminiResponse = serde_json::from_str(&body)?;

        if let Some(reason) = parsed.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(GeminiError::Blocked(reason));
        }

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect::<Vec<_>>().join(""))
            .unwrap_or_default();

        let text = strip_code_fence(text.trim());
        if text.is_empty() {
            return Err(GeminiError::EmptyResponse);
        }
        Ok(text.to_string())
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate_description(
        &self,
        product: &Product,
        options: &DescriptionOptions,
    ) -> GeminiResult<String> {
        let prompt = build_description_prompt(product, options);
        // ~4 tokens per word leaves room for emoji and hashtags
        let max_tokens = options.length.word_budget() * 4 + 64;
        self.generate_text(&prompt, max_tokens).await
    }
}

/// Strip a surrounding markdown code fence, if present.
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop an optional language tag on the opening fence line
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
