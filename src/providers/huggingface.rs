//! Hugging Face inference provider

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::config::prompts::Prompt;

use super::{ensure_success, read_json, Provider, ProviderError};

#[derive(Debug, Clone)]
pub struct HuggingFaceConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl HuggingFaceConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: "https://router.huggingface.co".to_string(),
            api_key: api_key.into(),
            model: "mistralai/Mistral-7B-Instruct-v0.3".to_string(),
        }
    }
}

pub struct HuggingFaceProvider {
    config: HuggingFaceConfig,
    client: Client,
}

impl HuggingFaceProvider {
    pub fn new(config: HuggingFaceConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }
}

/// Wrap a prompt in Mistral's instruction markers
fn instruct(prompt: &str) -> String {
    format!("<s>[INST] {} [/INST]", prompt)
}

fn parse_reply(body: &Value) -> Result<Option<String>, ProviderError> {
    if let Some(error) = body.get("error") {
        let message = error
            .as_str()
            .map(|s| s.to_string())
            .unwrap_or_else(|| error.to_string());
        return Err(ProviderError::Api(message));
    }
    Ok(body[0]["generated_text"].as_str().map(|s| s.to_string()))
}

#[async_trait]
impl Provider for HuggingFaceProvider {
    fn name(&self) -> &'static str {
        "huggingface"
    }

    async fn generate(
        &self,
        prompt: &Prompt,
        _image: Option<&str>,
    ) -> Result<Option<String>, ProviderError> {
        let url = format!(
            "{}/hf-inference/models/{}",
            self.config.base_url, self.config.model
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&json!({ "inputs": instruct(&prompt.text) }))
            .send()
            .await?;

        let (status, body) = read_json(response).await?;

        let reply = parse_reply(&body)?;
        ensure_success(status, &body)?;
        Ok(reply)
    }
}
