//! Application configuration

pub mod prompts;
pub mod settings;

use std::env;
use std::path::PathBuf;

pub use settings::{ConfigError, Settings};

/// Process configuration read from the environment.
///
/// A provider is enabled exactly when its credential is present and
/// non-empty.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub gemini_api_key: Option<String>,
    pub groq_api_key: Option<String>,
    pub cohere_api_key: Option<String>,
    pub hf_api_key: Option<String>,
    /// Key-value store binding (`memory` or a `sqlite:` URL)
    pub kv_url: Option<String>,
    pub settings: Settings,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let settings = match non_empty_var("ASSISTANT_CONFIG") {
            Some(path) => Settings::from_file(&PathBuf::from(path))?,
            None => Settings::default(),
        };

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".into()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            gemini_api_key: non_empty_var("GEMINI_API_KEY"),
            groq_api_key: non_empty_var("GROQ_API_KEY"),
            cohere_api_key: non_empty_var("COHERE_API_KEY"),
            hf_api_key: non_empty_var("HF_API_KEY"),
            kv_url: non_empty_var("KV_URL"),
            settings,
        })
    }

    /// True when at least one provider credential is configured
    pub fn any_provider_configured(&self) -> bool {
        [
            &self.gemini_api_key,
            &self.groq_api_key,
            &self.cohere_api_key,
            &self.hf_api_key,
        ]
        .iter()
        .any(|k| k.is_some())
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    non_empty(env::var(name).ok())
}

/// Only an empty value counts as unset; whitespace is still a value
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare() -> Config {
        Config {
            host: "127.0.0.1".into(),
            port: 3000,
            gemini_api_key: None,
            groq_api_key: None,
            cohere_api_key: None,
            hf_api_key: None,
            kv_url: None,
            settings: Settings::default(),
        }
    }

    #[test]
    fn test_any_provider_configured() {
        let mut config = bare();
        assert!(!config.any_provider_configured());

        config.cohere_api_key = Some("co-key".into());
        assert!(config.any_provider_configured());
    }

    #[test]
    fn test_only_empty_values_are_unset() {
        assert_eq!(non_empty(None), None);
        assert_eq!(non_empty(Some(String::new())), None);
        assert_eq!(non_empty(Some("  ".into())), Some("  ".to_string()));
        assert_eq!(non_empty(Some("gsk-1".into())), Some("gsk-1".to_string()));
    }
}
