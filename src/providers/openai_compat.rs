//! OpenAI-compatible provider
//!
//! Speaks the chat completions format, which Groq serves at
//! `https://api.groq.com/openai/v1`. Text only.
//!
//! # Configuration
//!
//! ```toml
//! [providers.groq]
//! base_url = "https://api.groq.com/openai/v1"
//! model = "llama-3.3-70b-versatile"
//! ```

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::prompts::Prompt;

use super::{ensure_success, read_json, Provider, ProviderError};

/// OpenAI-compatible chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Chat completion request
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

/// Chat completion response
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Error response from API
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// OpenAI-compatible provider configuration
#[derive(Debug, Clone)]
pub struct OpenAICompatConfig {
    /// Base URL for the API (e.g., https://api.groq.com/openai/v1)
    pub base_url: String,
    pub api_key: String,
    pub default_model: String,
}

impl OpenAICompatConfig {
    /// Create config for Groq
    pub fn groq(api_key: impl Into<String>) -> Self {
        Self {
            base_url: "https://api.groq.com/openai/v1".to_string(),
            api_key: api_key.into(),
            default_model: "llama-3.3-70b-versatile".to_string(),
        }
    }
}

/// OpenAI-compatible API provider
pub struct OpenAICompatProvider {
    name: &'static str,
    config: OpenAICompatConfig,
    client: Client,
}

impl OpenAICompatProvider {
    pub fn new(name: &'static str, config: OpenAICompatConfig) -> Self {
        Self {
            name,
            config,
            client: Client::new(),
        }
    }
}

fn parse_reply(body: Value) -> Result<Option<String>, ProviderError> {
    if let Ok(error_resp) = serde_json::from_value::<ErrorResponse>(body.clone()) {
        return Err(ProviderError::Api(error_resp.error.message));
    }

    let completion: ChatCompletionResponse = serde_json::from_value(body)
        .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

    Ok(completion
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content))
}

#[async_trait]
impl Provider for OpenAICompatProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn generate(
        &self,
        prompt: &Prompt,
        _image: Option<&str>,
    ) -> Result<Option<String>, ProviderError> {
        let url = format!("{}/chat/completions", self.config.base_url);

        let request = ChatCompletionRequest {
            model: self.config.default_model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.text.clone(),
            }],
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&request)
            .send()
            .await?;

        let (status, body) = read_json(response).await?;

        // API errors take precedence over the bare status
        let reply = parse_reply(body.clone())?;
        ensure_success(status, &body)?;
        Ok(reply)
    }
}
