//! Study Assistant - chat API for the study-assistant web app
//!
//! Receives chat messages from the browser client, applies a per-user rate
//! limit, adds short-term memory to the prompt and hands it to the first
//! AI provider (Gemini, Groq, Cohere, Hugging Face) that answers.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod core;
mod providers;
mod routes;
mod store;

use config::Config;
use crate::core::ChatEngine;
use store::KvStore;

/// How often expired rate counters and memories are swept from the store
const PURGE_INTERVAL: Duration = Duration::from_secs(600);

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub chat_engine: Arc<ChatEngine>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "study_assistant=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    // Without a store binding there is no rate limiting and no memory
    let kv: Option<Arc<dyn KvStore>> = match &config.kv_url {
        Some(url) => {
            let kv = store::open(url).await?;
            spawn_purge_task(kv.clone());
            tracing::info!("🗄️ Key-value store ready ({})", url);
            Some(kv)
        }
        None => {
            tracing::warn!("⚠️ KV_URL not set; rate limiting and memory disabled");
            None
        }
    };

    let providers = providers::build_providers(&config);
    if config.any_provider_configured() {
        let names: Vec<_> = providers.iter().map(|p| p.name()).collect();
        tracing::info!("📦 Provider cascade: {}", names.join(" -> "));
    } else {
        tracing::warn!("⚠️ No provider credentials configured; every chat will fail");
    }

    let chat_engine = Arc::new(ChatEngine::new(providers, kv, config.settings.clone()));

    let app = routes::app(AppState { chat_engine });

    tracing::info!("🔥 Study assistant API running at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn spawn_purge_task(kv: Arc<dyn KvStore>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        loop {
            interval.tick().await;
            match kv.purge_expired().await {
                Ok(0) => {}
                Ok(n) => tracing::debug!("Purged {} expired entries", n),
                Err(e) => tracing::warn!(error = %e, "Failed to purge expired entries"),
            }
        }
    });
}
