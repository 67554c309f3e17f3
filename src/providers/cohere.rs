//! Cohere chat provider
//!
//! Unlike the others, Cohere takes the system preamble and the raw student
//! message as separate fields.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use crate::config::prompts::Prompt;

use super::{ensure_success, read_json, Provider, ProviderError};

#[derive(Debug, Clone)]
pub struct CohereConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl CohereConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: "https://api.cohere.com".to_string(),
            api_key: api_key.into(),
            model: "command-r-08-2024".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct CohereChatRequest<'a> {
    model: &'a str,
    message: &'a str,
    preamble: &'a str,
}

pub struct CohereProvider {
    config: CohereConfig,
    client: Client,
}

impl CohereProvider {
    pub fn new(config: CohereConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }
}

/// Cohere reports failures as a top-level `message`; replies live in `text`
fn parse_reply(body: &Value) -> Result<Option<String>, ProviderError> {
    if let Some(message) = body.get("message").and_then(|m| m.as_str()) {
        return Err(ProviderError::Api(message.to_string()));
    }
    Ok(body["text"].as_str().map(|s| s.to_string()))
}

#[async_trait]
impl Provider for CohereProvider {
    fn name(&self) -> &'static str {
        "cohere"
    }

    async fn generate(
        &self,
        prompt: &Prompt,
        _image: Option<&str>,
    ) -> Result<Option<String>, ProviderError> {
        let request = CohereChatRequest {
            model: &self.config.model,
            message: &prompt.message,
            preamble: &prompt.preamble,
        };

        let response = self
            .client
            .post(format!("{}/v1/chat", self.config.base_url))
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&request)
            .send()
            .await?;

        let (status, body) = read_json(response).await?;

        let reply = parse_reply(&body)?;
        ensure_success(status, &body)?;
        Ok(reply)
    }
}
