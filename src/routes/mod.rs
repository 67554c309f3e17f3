//! API routes

use axum::{
    body::Bytes,
    extract::State,
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::Instrument;

use crate::config::prompts::ExamMode;
use crate::core::{ChatError, ChatRequest, SubjectAttachment, GUEST_UID};
use crate::AppState;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Chat payload as sent by the browser client. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IncomingRequest {
    message: Option<String>,
    image: Option<String>,
    subject: Option<String>,
    language: Option<String>,
    exam_mode: Option<String>,
    goal: Option<String>,
    uid: Option<String>,
    large_subjects: Option<Vec<SubjectAttachment>>,
}

fn is_ping(body: &Value) -> bool {
    body.get("type").and_then(Value::as_str) == Some("ping")
}

impl IncomingRequest {
    fn into_chat_request(self) -> ChatRequest {
        let defaults = ChatRequest::default();
        let present = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        ChatRequest {
            message: self.message.unwrap_or_default(),
            image: present(self.image),
            subject: present(self.subject).unwrap_or(defaults.subject),
            language: present(self.language).unwrap_or(defaults.language),
            exam_mode: self
                .exam_mode
                .as_deref()
                .map(ExamMode::from_name)
                .unwrap_or_default(),
            goal: self.goal.unwrap_or_default(),
            uid: present(self.uid).unwrap_or_else(|| GUEST_UID.to_string()),
            large_subjects: self.large_subjects.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    debug: Vec<String>,
}

fn error_response(err: ChatError, expose_diagnostics: bool) -> Response {
    let status = match err {
        ChatError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let debug = match &err {
        ChatError::AllProvidersFailed { diagnostics } if expose_diagnostics => diagnostics.clone(),
        _ => Vec::new(),
    };

    (
        status,
        Json(ErrorBody {
            error: err.to_string(),
            debug,
        }),
    )
        .into_response()
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn ai_chat(State(state): State<AppState>, body: Bytes) -> Response {
    let span = tracing::info_span!("ai_chat", request_id = %uuid::Uuid::new_v4());

    async move {
        let engine = &state.chat_engine;
        let expose = engine.settings().assistant.expose_diagnostics;

        // Ping only needs `type`, whatever else the body carries
        let incoming = match serde_json::from_slice::<Value>(&body) {
            Ok(value) if is_ping(&value) => return Json(engine.ping()).into_response(),
            Ok(value) => serde_json::from_value::<IncomingRequest>(value),
            Err(e) => Err(e),
        };

        let incoming = match incoming {
            Ok(incoming) => incoming,
            Err(e) => {
                tracing::warn!(error = %e, "Malformed chat request");
                return error_response(ChatError::MalformedRequest(e.to_string()), expose);
            }
        };

        match engine.chat(incoming.into_chat_request()).await {
            Ok(reply) => {
                tracing::info!(provider = reply.provider, "Chat answered");
                Json(reply).into_response()
            }
            Err(e) => error_response(e, expose),
        }
    }
    .instrument(span)
    .await
}

async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// Any origin, POST/OPTIONS, Content-Type
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/api/ai-chat", post(ai_chat).options(preflight))
}

/// The complete application with CORS and request tracing
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(router())
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::Request;
    use serde_json::json;
    use tower::ServiceExt;

    use crate::config::{Config, Settings};
    use crate::core::ChatEngine;
    use crate::providers::testing::spawn_upstream;
    use crate::providers::build_providers;
    use crate::store::{InMemoryKvStore, KvStore};

    fn config(gemini_base: Option<&str>) -> Config {
        let mut settings = Settings::default();
        if let Some(base) = gemini_base {
            settings.providers.gemini.base_url = Some(base.to_string());
        }
        Config {
            host: "127.0.0.1".into(),
            port: 0,
            gemini_api_key: gemini_base.map(|_| "g-key".to_string()),
            groq_api_key: None,
            cohere_api_key: None,
            hf_api_key: None,
            kv_url: Some("memory".into()),
            settings,
        }
    }

    fn test_app(config: &Config, store: Arc<dyn KvStore>) -> Router {
        let engine = ChatEngine::new(
            build_providers(config),
            Some(store),
            config.settings.clone(),
        );
        app(AppState {
            chat_engine: Arc::new(engine),
        })
    }

    async fn post_chat(app: &Router, body: impl Into<Body>) -> (StatusCode, Value) {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/ai-chat")
                    .header("content-type", "application/json")
                    .body(body.into())
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_end_to_end_reply_and_memory() {
        let upstream = spawn_upstream(
            StatusCode::OK,
            json!({"candidates":[{"content":{"parts":[{"text":"Photosynthesis is..."}]}}]}),
        )
        .await;
        let store: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let app = test_app(&config(Some(&upstream.base_url)), store.clone());

        let (status, body) = post_chat(
            &app,
            json!({"uid": "u1", "message": "Explain photosynthesis", "subject": "Biology"}).to_string(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"reply": "Photosynthesis is..."}));

        let memory = store.get("mem:u1").await.unwrap().unwrap();
        assert!(memory.ends_with("\nUser: Explain photosynthesis\nAI: Photosynthesis is..."));

        let sent = &upstream.requests()[0].body;
        let prompt = sent["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(prompt.contains("Subject: Biology"));
        assert!(prompt.ends_with("Student: Explain photosynthesis"));
    }

    #[tokio::test]
    async fn test_ping_does_not_touch_store() {
        let store: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let app = test_app(&config(Some("http://127.0.0.1:9")), store.clone());

        for _ in 0..3 {
            let (status, body) = post_chat(&app, r#"{"type":"ping","uid":"u1"}"#).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["status"], "ok");
            assert_eq!(body["keys_detected"]["gemini"], true);
            assert_eq!(body["keys_detected"]["groq"], false);
        }

        assert_eq!(store.get("rate:u1").await.unwrap(), None);
        assert_eq!(store.get("mem:u1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_ping_ignores_mistyped_fields() {
        let store: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let app = test_app(&config(Some("http://127.0.0.1:9")), store.clone());

        let (status, body) = post_chat(&app, r#"{"type":"ping","message":5,"uid":"u1"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(store.get("rate:u1").await.unwrap(), None);

        let (status, _) = post_chat(&app, r#"{"type":"chat","message":5}"#).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_ping_fails_without_credentials() {
        let store: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let app = test_app(&config(None), store);

        let (status, body) = post_chat(&app, r#"{"type":"ping"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "fail");
    }

    #[tokio::test]
    async fn test_fifty_first_request_is_rate_limited() {
        let store: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let app = test_app(&config(None), store);
        let payload = json!({"uid": "u2", "message": "hello"}).to_string();

        for _ in 0..50 {
            let (status, _) = post_chat(&app, payload.clone()).await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        }

        let (status, body) = post_chat(&app, payload).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body, json!({"error": "Rate limit exceeded."}));
    }

    #[tokio::test]
    async fn test_rate_limited_user_reaches_no_provider() {
        let upstream = spawn_upstream(StatusCode::OK, json!({})).await;
        let store: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        store
            .put("rate:u2", "51", Duration::from_secs(60))
            .await
            .unwrap();
        let app = test_app(&config(Some(&upstream.base_url)), store);

        let (status, _) = post_chat(&app, r#"{"uid":"u2","message":"hello"}"#).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert!(upstream.requests().is_empty());
    }

    #[tokio::test]
    async fn test_all_providers_failed() {
        let upstream = spawn_upstream(
            StatusCode::FORBIDDEN,
            json!({"error": {"message": "API key not valid."}}),
        )
        .await;
        let store: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());

        let app = test_app(&config(Some(&upstream.base_url)), store.clone());
        let (status, body) = post_chat(&app, r#"{"uid":"u5","message":"hi"}"#).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "All AI providers failed."}));
        assert_eq!(store.get("mem:u5").await.unwrap(), None);

        let mut verbose = config(Some(&upstream.base_url));
        verbose.settings.assistant.expose_diagnostics = true;
        let app = test_app(&verbose, store);
        let (_, body) = post_chat(&app, r#"{"uid":"u5","message":"hi"}"#).await;
        assert_eq!(body["debug"], json!(["gemini: API error: API key not valid."]));
    }

    #[tokio::test]
    async fn test_malformed_body_is_server_error() {
        let store: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let app = test_app(&config(None), store);

        let (status, body) = post_chat(&app, "{not json").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().starts_with("Invalid request"));

        let (status, body) = post_chat(&app, r#"{"uid":"u1"}"#).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "No input provided");
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let store: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let app = test_app(&config(None), store);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/api/ai-chat")
                    .header("origin", "https://example.org")
                    .header("access-control-request-method", "POST")
                    .header("access-control-request-headers", "content-type")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(response.status().is_success());
        let headers = response.headers();
        assert_eq!(headers["access-control-allow-origin"], "*");
        let methods = headers["access-control-allow-methods"].to_str().unwrap();
        assert!(methods.contains("POST"));
        assert!(methods.contains("OPTIONS"));

        let bare = app
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/api/ai-chat")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(bare.status(), StatusCode::NO_CONTENT);
    }

    #[test]
    fn test_incoming_defaults() {
        let incoming: IncomingRequest =
            serde_json::from_str(r#"{"message":"hi","uid":"","image":null,"examMode":"5marks"}"#)
                .unwrap();

        let request = incoming.into_chat_request();
        assert_eq!(request.uid, GUEST_UID);
        assert_eq!(request.subject, "General");
        assert_eq!(request.language, "English");
        assert_eq!(request.exam_mode, ExamMode::FiveMarks);
        assert!(request.image.is_none());
    }
}
