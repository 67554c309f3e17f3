//! Tunable settings loaded from an optional TOML file
//!
//! Every field has a default, so an empty file (or no file at all) yields
//! the stock behaviour.
//!
//! ```toml
//! [limits]
//! rate_limit = 50
//! rate_window_secs = 60
//!
//! [memory]
//! max_lines = 20
//! ttl_secs = 604800
//!
//! [assistant]
//! name = "Appana AI"
//! decorate_replies = false
//!
//! [providers.groq]
//! model = "llama-3.1-8b-instant"
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Longest expiry accepted for any stored entry (one year)
pub const MAX_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// Root settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub limits: LimitSettings,

    #[serde(default)]
    pub memory: MemorySettings,

    #[serde(default)]
    pub assistant: AssistantSettings,

    #[serde(default)]
    pub providers: ProviderOverrides,
}

impl Settings {
    /// Load settings from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let settings = Self::from_toml(&content)?;
        Ok(settings)
    }

    /// Load settings from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.rate_window_secs == 0 {
            return Err(ConfigError::Validation(
                "limits.rate_window_secs must be positive".into(),
            ));
        }
        if self.limits.rate_window_secs > MAX_TTL_SECS {
            return Err(ConfigError::Validation(format!(
                "limits.rate_window_secs must be at most {}",
                MAX_TTL_SECS
            )));
        }
        if self.memory.ttl_secs > MAX_TTL_SECS {
            return Err(ConfigError::Validation(format!(
                "memory.ttl_secs must be at most {}",
                MAX_TTL_SECS
            )));
        }
        if self.memory.max_lines == 0 {
            return Err(ConfigError::Validation(
                "memory.max_lines must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Per-user request limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitSettings {
    /// Requests admitted per window
    #[serde(default = "default_rate_limit")]
    pub rate_limit: u64,

    #[serde(default = "default_rate_window")]
    pub rate_window_secs: u64,
}

impl LimitSettings {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.rate_window_secs)
    }
}

fn default_rate_limit() -> u64 {
    50
}

fn default_rate_window() -> u64 {
    60
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self {
            rate_limit: default_rate_limit(),
            rate_window_secs: default_rate_window(),
        }
    }
}

/// Rolling conversation memory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemorySettings {
    #[serde(default = "default_max_lines")]
    pub max_lines: usize,

    #[serde(default = "default_memory_ttl")]
    pub ttl_secs: u64,
}

impl MemorySettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

fn default_max_lines() -> usize {
    20
}

fn default_memory_ttl() -> u64 {
    7 * 24 * 60 * 60
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            max_lines: default_max_lines(),
            ttl_secs: default_memory_ttl(),
        }
    }
}

/// Assistant persona and reply handling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantSettings {
    #[serde(default = "default_name")]
    pub name: String,

    /// Append keyword emojis to each reply sentence
    #[serde(default)]
    pub decorate_replies: bool,

    /// Include per-provider failure lines in error bodies
    #[serde(default)]
    pub expose_diagnostics: bool,
}

fn default_name() -> String {
    "Appana AI".to_string()
}

impl Default for AssistantSettings {
    fn default() -> Self {
        Self {
            name: default_name(),
            decorate_replies: false,
            expose_diagnostics: false,
        }
    }
}

/// Optional per-provider endpoint and model overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderOverrides {
    #[serde(default)]
    pub gemini: ProviderOverride,

    #[serde(default)]
    pub groq: ProviderOverride,

    #[serde(default)]
    pub cohere: ProviderOverride,

    #[serde(default)]
    pub huggingface: ProviderOverride,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderOverride {
    #[serde(default)]
    pub model: Option<String>,

    #[serde(default)]
    pub base_url: Option<String>,
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}
