//! Google Gemini provider
//!
//! The only multimodal provider: an attached image travels as an
//! `inline_data` part next to the prompt text.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::config::prompts::Prompt;

use super::{ensure_success, read_json, Provider, ProviderError};

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            api_key: api_key.into(),
            model: "gemini-1.5-flash".to_string(),
        }
    }
}

pub struct GeminiProvider {
    config: GeminiConfig,
    client: Client,
}

impl GeminiProvider {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }
}

fn request_body(prompt: &str, image: Option<&str>) -> Value {
    let mut parts = vec![json!({ "text": prompt })];
    if let Some(data) = image {
        parts.push(json!({
            "inline_data": { "mime_type": "image/jpeg", "data": data }
        }));
    }
    json!({ "contents": [{ "parts": parts }] })
}

fn extract_reply(body: &Value) -> Option<String> {
    body["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .map(|s| s.to_string())
}

fn extract_error(body: &Value) -> Option<String> {
    let error = body.get("error")?;
    Some(
        error["message"]
            .as_str()
            .map(|s| s.to_string())
            .unwrap_or_else(|| error.to_string()),
    )
}

#[async_trait]
impl Provider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn supports_image(&self) -> bool {
        true
    }

    async fn generate(
        &self,
        prompt: &Prompt,
        image: Option<&str>,
    ) -> Result<Option<String>, ProviderError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url, self.config.model
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&request_body(&prompt.text, image))
            .send()
            .await?;

        let (status, body) = read_json(response).await?;

        if let Some(message) = extract_error(&body) {
            return Err(ProviderError::Api(message));
        }
        ensure_success(status, &body)?;

        Ok(extract_reply(&body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::testing::spawn_upstream;
    use crate::providers::AttemptOutcome;
    use reqwest::StatusCode;

    fn prompt() -> Prompt {
        Prompt {
            preamble: "You are Appana AI".into(),
            message: "Explain photosynthesis".into(),
            text: "You are Appana AI\n\nStudent: Explain photosynthesis".into(),
        }
    }

    #[test]
    fn test_request_body_with_image() {
        let body = request_body("What is in this picture?", Some("aGVsbG8="));
        let parts = body["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0]["text"], "What is in this picture?");
        assert_eq!(parts[1]["inline_data"]["mime_type"], "image/jpeg");
        assert_eq!(parts[1]["inline_data"]["data"], "aGVsbG8=");

        let text_only = request_body("hi", None);
        assert_eq!(text_only["contents"][0]["parts"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_extract_reply_and_error() {
        let ok = json!({"candidates":[{"content":{"parts":[{"text":"Photosynthesis is..."}]}}]});
        assert_eq!(extract_reply(&ok).as_deref(), Some("Photosynthesis is..."));
        assert_eq!(extract_error(&ok), None);

        let blocked = json!({"candidates":[], "promptFeedback": {"blockReason": "SAFETY"}});
        assert_eq!(extract_reply(&blocked), None);

        let err = json!({"error": {"code": 400, "message": "API key not valid."}});
        assert_eq!(extract_error(&err).as_deref(), Some("API key not valid."));
    }

    #[tokio::test]
    async fn test_generate_against_upstream() {
        let upstream = spawn_upstream(
            StatusCode::OK,
            json!({"candidates":[{"content":{"parts":[{"text":"Photosynthesis is..."}]}}]}),
        )
        .await;

        let mut config = GeminiConfig::new("g-key");
        config.base_url = upstream.base_url.clone();
        let provider = GeminiProvider::new(config);

        let outcome = provider.attempt(&prompt(), Some("aGVsbG8=")).await;
        assert_eq!(outcome, AttemptOutcome::Success("Photosynthesis is...".into()));

        let requests = upstream.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].path_and_query,
            "/v1beta/models/gemini-1.5-flash:generateContent"
        );
        assert_eq!(requests[0].goog_api_key.as_deref(), Some("g-key"));
        assert_eq!(
            requests[0].body["contents"][0]["parts"][0]["text"],
            "You are Appana AI\n\nStudent: Explain photosynthesis"
        );
        assert_eq!(
            requests[0].body["contents"][0]["parts"][1]["inline_data"]["data"],
            "aGVsbG8="
        );
    }

    #[tokio::test]
    async fn test_unreachable_upstream_keeps_key_out_of_error() {
        let mut config = GeminiConfig::new("SECRET-GEMINI-KEY");
        config.base_url = "http://127.0.0.1:9".to_string();
        let provider = GeminiProvider::new(config);

        match provider.attempt(&prompt(), None).await {
            AttemptOutcome::TransportError(detail) => {
                assert!(!detail.contains("SECRET-GEMINI-KEY"), "{}", detail);
                assert!(!detail.contains("127.0.0.1:9"), "{}", detail);
            }
            other => panic!("expected transport error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_api_error_is_transport_error() {
        let upstream = spawn_upstream(
            StatusCode::BAD_REQUEST,
            json!({"error": {"code": 400, "message": "API key not valid."}}),
        )
        .await;

        let mut config = GeminiConfig::new("bad");
        config.base_url = upstream.base_url.clone();
        let provider = GeminiProvider::new(config);

        assert_eq!(
            provider.attempt(&prompt(), None).await,
            AttemptOutcome::TransportError("API error: API key not valid.".into())
        );
    }
}
