//! Chat engine with provider cascade
//!
//! The ChatEngine handles one chat request at a time:
//! 1. Admits the request through the per-user rate limiter
//! 2. Loads short-term memory (never for guests)
//! 3. Builds the prompt
//! 4. Tries each configured provider in order until one replies
//! 5. Saves the exchange to memory (not for guests or image requests)

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::prompts::{build_prompt, ExamMode, Prompt};
use crate::config::Settings;
use crate::providers::{AttemptOutcome, Provider, PROVIDER_NAMES};
use crate::store::KvStore;

use super::decorate::decorate_reply;
use super::memory::{ShortTermMemory, GUEST_UID};
use super::rate_limit::{RateDecision, RateLimiter};

/// Subject material attached by the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectAttachment {
    pub name: String,
    pub content: String,
}

/// Request to the chat engine
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// The student's message
    pub message: String,

    /// Base64 image, sent only to image-capable providers
    pub image: Option<String>,

    pub subject: String,

    pub language: String,

    pub exam_mode: ExamMode,

    /// Optional goal or target exam
    pub goal: String,

    /// User identifier, or [`GUEST_UID`]
    pub uid: String,

    pub large_subjects: Vec<SubjectAttachment>,
}

impl Default for ChatRequest {
    fn default() -> Self {
        Self {
            message: String::new(),
            image: None,
            subject: "General".to_string(),
            language: "English".to_string(),
            exam_mode: ExamMode::Normal,
            goal: String::new(),
            uid: GUEST_UID.to_string(),
            large_subjects: Vec::new(),
        }
    }
}

/// Response from the chat engine
#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub reply: String,

    /// Provider that produced the reply
    #[serde(skip)]
    pub provider: &'static str,
}

/// Health report for ping requests
#[derive(Debug, Clone, Serialize)]
pub struct PingReport {
    pub status: &'static str,
    pub keys_detected: BTreeMap<&'static str, bool>,
}

/// Errors from the chat engine
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("No input provided")]
    EmptyInput,

    #[error("Rate limit exceeded.")]
    RateLimited,

    #[error("All AI providers failed.")]
    AllProvidersFailed { diagnostics: Vec<String> },

    #[error("Invalid request: {0}")]
    MalformedRequest(String),
}

/// The core chat engine
pub struct ChatEngine {
    providers: Vec<Arc<dyn Provider>>,
    limiter: Option<RateLimiter>,
    memory: Option<ShortTermMemory>,
    settings: Settings,
}

impl ChatEngine {
    /// Create a chat engine. Without a store there is no rate limiting and
    /// no memory.
    pub fn new(
        providers: Vec<Arc<dyn Provider>>,
        store: Option<Arc<dyn KvStore>>,
        settings: Settings,
    ) -> Self {
        let limiter = store
            .as_ref()
            .map(|s| RateLimiter::new(s.clone(), &settings.limits));
        let memory = store.map(|s| ShortTermMemory::new(s, &settings.memory));

        Self {
            providers,
            limiter,
            memory,
            settings,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Report which providers are configured, without calling any of them
    pub fn ping(&self) -> PingReport {
        let keys_detected: BTreeMap<_, _> = PROVIDER_NAMES
            .iter()
            .map(|name| (*name, self.providers.iter().any(|p| p.name() == *name)))
            .collect();

        PingReport {
            status: if self.providers.is_empty() { "fail" } else { "ok" },
            keys_detected,
        }
    }

    /// Process a chat request and return a reply
    pub async fn chat(&self, request: ChatRequest) -> Result<ChatReply, ChatError> {
        if request.message.trim().is_empty() && request.image.is_none() {
            return Err(ChatError::EmptyInput);
        }

        if let Some(limiter) = &self.limiter {
            if let RateDecision::Limited { count } = limiter.admit(&request.uid).await {
                tracing::info!(uid = %request.uid, count, "Rate limit exceeded");
                return Err(ChatError::RateLimited);
            }
        }

        let memory = match &self.memory {
            Some(store) => store.load(&request.uid).await.unwrap_or_else(|e| {
                tracing::warn!(uid = %request.uid, error = %e, "Failed to load memory");
                String::new()
            }),
            None => String::new(),
        };

        let prompt = build_prompt(&self.settings.assistant.name, &request, &memory);
        let image = request.image.as_deref();

        let (provider, mut reply) = self
            .cascade(&prompt, image)
            .await
            .map_err(|diagnostics| ChatError::AllProvidersFailed { diagnostics })?;

        tracing::debug!(provider, uid = %request.uid, "Reply generated");

        if self.settings.assistant.decorate_replies {
            reply = decorate_reply(&reply);
        }

        if let Some(store) = &self.memory {
            if request.uid != GUEST_UID && image.is_none() {
                if let Err(e) = store
                    .remember(&request.uid, &memory, &request.message, &reply)
                    .await
                {
                    tracing::warn!(uid = %request.uid, error = %e, "Failed to save memory");
                }
            }
        }

        Ok(ChatReply { reply, provider })
    }

    /// Try providers in order. Returns the first reply, or one diagnostic
    /// line per provider when none replied.
    async fn cascade(
        &self,
        prompt: &Prompt,
        image: Option<&str>,
    ) -> Result<(&'static str, String), Vec<String>> {
        let mut diagnostics = Vec::new();

        for provider in &self.providers {
            let name = provider.name();

            if image.is_some() && !provider.supports_image() {
                diagnostics.push(format!("{}: skipped (image attached)", name));
                continue;
            }

            match provider.attempt(prompt, image).await {
                AttemptOutcome::Success(text) => return Ok((name, text)),
                AttemptOutcome::Declined => {
                    tracing::debug!(provider = name, "Provider returned no reply");
                    diagnostics.push(format!("{}: no reply", name));
                }
                AttemptOutcome::TransportError(detail) => {
                    tracing::warn!(provider = name, error = %detail, "Provider failed");
                    diagnostics.push(format!("{}: {}", name, detail));
                }
            }
        }

        if self.providers.is_empty() {
            diagnostics.push("no providers configured".to_string());
        }

        Err(diagnostics)
    }
}
