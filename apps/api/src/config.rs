use anyhow::{Context, Result};

use crate::ai::settings::{Credentials, ProviderConfig};

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres URL for the settings store. Unset runs with in-memory settings.
    pub database_url: Option<String>,
    pub port: u16,
    pub rust_log: String,
    /// Default provider keys, only used while no settings document exists.
    pub gemini_api_key: String,
    pub openrouter_api_key: String,
    pub groq_api_key: String,
    /// Sent to OpenRouter as `HTTP-Referer`.
    pub app_url: String,
    /// Sent to OpenRouter as `X-Title`.
    pub app_name: String,
    pub ai_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: optional_env("DATABASE_URL"),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            gemini_api_key: optional_env("GEMINI_API_KEY").unwrap_or_default(),
            openrouter_api_key: optional_env("OPENROUTER_API_KEY").unwrap_or_default(),
            groq_api_key: optional_env("GROQ_API_KEY").unwrap_or_default(),
            app_url: optional_env("APP_URL")
                .unwrap_or_else(|| "http://localhost:5173".to_string()),
            app_name: optional_env("APP_NAME").unwrap_or_else(|| "CareerHub".to_string()),
            ai_timeout_secs: std::env::var("AI_HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|_| "120".to_string())
                .parse::<u64>()
                .context("AI_HTTP_TIMEOUT_SECS must be a whole number of seconds")?,
        })
    }

    /// Provider configuration served until an admin saves one.
    pub fn default_provider_config(&self) -> ProviderConfig {
        ProviderConfig::defaults(Credentials::from_keys(
            &self.gemini_api_key,
            &self.openrouter_api_key,
            &self.groq_api_key,
        ))
    }
}

/// Treats an empty variable the same as an unset one.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::provider::ProviderId;

    fn sample() -> Config {
        Config {
            database_url: None,
            port: 8080,
            rust_log: "info".to_string(),
            gemini_api_key: "AIza-env".to_string(),
            openrouter_api_key: String::new(),
            groq_api_key: "gsk-env".to_string(),
            app_url: "http://localhost:5173".to_string(),
            app_name: "CareerHub".to_string(),
            ai_timeout_secs: 120,
        }
    }

    #[test]
    fn test_default_provider_config_uses_env_keys() {
        let config = sample().default_provider_config();
        assert_eq!(config.primary, ProviderId::Gemini);
        assert_eq!(config.credential(ProviderId::Gemini).api_key, "AIza-env");
        assert_eq!(config.credential(ProviderId::Groq).api_key, "gsk-env");
        assert!(!config.credential(ProviderId::OpenRouter).has_key());
    }
}
