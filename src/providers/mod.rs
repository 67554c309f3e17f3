//! AI provider integrations
//!
//! Each provider wraps one third-party generation API behind the
//! [`Provider`] trait. The chat engine walks them in priority order and keeps
//! the first usable reply.

mod cohere;
mod gemini;
mod huggingface;
mod openai_compat;

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

use crate::config::prompts::Prompt;
use crate::config::settings::ProviderOverride;
use crate::config::Config;

pub use cohere::{CohereConfig, CohereProvider};
pub use gemini::{GeminiConfig, GeminiProvider};
pub use huggingface::{HuggingFaceConfig, HuggingFaceProvider};
pub use openai_compat::{OpenAICompatConfig, OpenAICompatProvider};

/// Every provider the service knows about, in cascade order
pub const PROVIDER_NAMES: [&str; 4] = ["gemini", "groq", "cohere", "huggingface"];

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Request failed: {0}")]
    RequestFailed(reqwest::Error),

    #[error("API error: {0}")]
    Api(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

// Request URLs can carry credentials, so they never reach error text
impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        ProviderError::RequestFailed(e.without_url())
    }
}

/// Result of handing a prompt to one provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// A non-empty reply
    Success(String),
    /// The provider answered without usable text, or cannot take this input
    Declined,
    /// The call itself failed
    TransportError(String),
}

#[async_trait]
pub trait Provider: Send + Sync {
    /// Stable identifier used in logs and health reports
    fn name(&self) -> &'static str;

    /// Whether the provider accepts an image alongside the prompt
    fn supports_image(&self) -> bool {
        false
    }

    /// Call the upstream API. `Ok(None)` means it answered but had no reply text.
    async fn generate(
        &self,
        prompt: &Prompt,
        image: Option<&str>,
    ) -> Result<Option<String>, ProviderError>;

    /// Call the provider and classify the result
    async fn attempt(&self, prompt: &Prompt, image: Option<&str>) -> AttemptOutcome {
        if image.is_some() && !self.supports_image() {
            return AttemptOutcome::Declined;
        }

        match self.generate(prompt, image).await {
            Ok(Some(text)) if !text.trim().is_empty() => AttemptOutcome::Success(text),
            Ok(_) => AttemptOutcome::Declined,
            Err(e) => AttemptOutcome::TransportError(e.to_string()),
        }
    }
}

/// Build the configured providers in cascade order: Gemini, Groq, Cohere,
/// Hugging Face. Providers without a credential are left out.
pub fn build_providers(config: &Config) -> Vec<Arc<dyn Provider>> {
    let overrides = &config.settings.providers;
    let mut providers: Vec<Arc<dyn Provider>> = Vec::new();

    if let Some(key) = &config.gemini_api_key {
        let mut cfg = GeminiConfig::new(key.clone());
        apply_override(&mut cfg.base_url, &mut cfg.model, &overrides.gemini);
        providers.push(Arc::new(GeminiProvider::new(cfg)));
    }

    if let Some(key) = &config.groq_api_key {
        let mut cfg = OpenAICompatConfig::groq(key.clone());
        apply_override(&mut cfg.base_url, &mut cfg.default_model, &overrides.groq);
        providers.push(Arc::new(OpenAICompatProvider::new("groq", cfg)));
    }

    if let Some(key) = &config.cohere_api_key {
        let mut cfg = CohereConfig::new(key.clone());
        apply_override(&mut cfg.base_url, &mut cfg.model, &overrides.cohere);
        providers.push(Arc::new(CohereProvider::new(cfg)));
    }

    if let Some(key) = &config.hf_api_key {
        let mut cfg = HuggingFaceConfig::new(key.clone());
        apply_override(&mut cfg.base_url, &mut cfg.model, &overrides.huggingface);
        providers.push(Arc::new(HuggingFaceProvider::new(cfg)));
    }

    providers
}

fn apply_override(base_url: &mut String, model: &mut String, o: &ProviderOverride) {
    if let Some(url) = &o.base_url {
        *base_url = url.trim_end_matches('/').to_string();
    }
    if let Some(m) = &o.model {
        *model = m.clone();
    }
}

/// Read a response body as JSON, keeping the status for error reporting
async fn read_json(response: reqwest::Response) -> Result<(StatusCode, Value), ProviderError> {
    let status = response.status();
    let body = response.text().await?;

    let value = serde_json::from_str(&body).map_err(|e| {
        ProviderError::InvalidResponse(format!("HTTP {}: {} - Body: {}", status, e, body))
    })?;

    Ok((status, value))
}

/// Fail on a non-success status that carried no provider-specific error
fn ensure_success(status: StatusCode, body: &Value) -> Result<(), ProviderError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(ProviderError::InvalidResponse(format!("HTTP {}: {}", status, body)))
    }
}
