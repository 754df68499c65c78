//! Provider clients — one per `ProviderId`, each owning exactly one wire protocol.
//!
//! A client call is a single HTTP round trip. Clients never retry; moving on
//! to another provider is the orchestrator's job.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Serialize;
use serde_json::Value;

use crate::ai::error::AiError;
use crate::ai::provider::ProviderId;
use crate::ai::settings::ProviderConfig;

mod chat;
pub mod gemini;
pub mod groq;
pub mod openrouter;

pub use gemini::GeminiClient;
pub use groq::GroqClient;
pub use openrouter::OpenRouterClient;

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai";
pub const GROQ_BASE_URL: &str = "https://api.groq.com";

/// A successful provider call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Completion {
    pub provider: ProviderId,
    pub model: String,
    pub text: String,
}

/// Sampling parameters. Gemini sends all four; chat-completion providers
/// send temperature and max tokens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_k: 40,
            top_p: 0.95,
            max_output_tokens: 2048,
        }
    }
}

/// Base URLs of the three vendors. Overridden in tests.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub gemini: String,
    pub openrouter: String,
    pub groq: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            gemini: GEMINI_BASE_URL.to_string(),
            openrouter: OPENROUTER_BASE_URL.to_string(),
            groq: GROQ_BASE_URL.to_string(),
        }
    }
}

impl Endpoints {
    /// Points every provider at the same base URL (a mock server).
    #[cfg(test)]
    pub fn all(base_url: &str) -> Self {
        Self {
            gemini: base_url.to_string(),
            openrouter: base_url.to_string(),
            groq: base_url.to_string(),
        }
    }
}

/// Attribution headers OpenRouter asks callers to send.
#[derive(Debug, Clone)]
pub struct Attribution {
    pub referer: String,
    pub title: String,
}

/// Seam between the orchestrator/probe and the network.
#[async_trait]
pub trait ProviderBackend: Send + Sync {
    async fn call(
        &self,
        provider: ProviderId,
        prompt: &str,
        config: &ProviderConfig,
    ) -> Result<Completion, AiError>;
}

/// Builds the shared HTTP client. `timeout` is the only deadline applied to
/// provider calls.
pub fn build_http_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder().timeout(timeout).build()
}

/// Production backend: dispatches each `ProviderId` to its wire client.
pub struct HttpBackend {
    gemini: GeminiClient,
    openrouter: OpenRouterClient,
    groq: GroqClient,
}

impl HttpBackend {
    pub fn new(
        http: Client,
        endpoints: Endpoints,
        attribution: Attribution,
        params: GenerationParams,
    ) -> Self {
        Self {
            gemini: GeminiClient::new(http.clone(), endpoints.gemini, params),
            openrouter: OpenRouterClient::new(
                http.clone(),
                endpoints.openrouter,
                attribution,
                params,
            ),
            groq: GroqClient::new(http, endpoints.groq, params),
        }
    }
}

#[async_trait]
impl ProviderBackend for HttpBackend {
    async fn call(
        &self,
        provider: ProviderId,
        prompt: &str,
        config: &ProviderConfig,
    ) -> Result<Completion, AiError> {
        match provider {
            ProviderId::Gemini => self.gemini.call(prompt, config).await,
            ProviderId::OpenRouter => self.openrouter.call(prompt, config).await,
            ProviderId::Groq => self.groq.call(prompt, config).await,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers shared by the wire clients
// ────────────────────────────────────────────────────────────────────────────

/// Returns the provider's API key, or `MissingCredential` when it is blank.
fn require_key(provider: ProviderId, config: &ProviderConfig) -> Result<&str, AiError> {
    let credential = config.credential(provider);
    if credential.has_key() {
        Ok(&credential.api_key)
    } else {
        Err(AiError::MissingCredential { provider })
    }
}

/// Transport failure with the request URL stripped; Gemini's URL carries the key.
fn transport_error(provider: ProviderId, source: reqwest::Error) -> AiError {
    AiError::Transport {
        provider,
        source: source.without_url(),
    }
}

/// Sends the request and reads the whole body.
async fn send(provider: ProviderId, request: RequestBuilder) -> Result<(StatusCode, String), AiError> {
    let response = request
        .send()
        .await
        .map_err(|source| transport_error(provider, source))?;
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|source| transport_error(provider, source))?;
    Ok((status, body))
}

/// Pulls `error.message` (or a bare `error` string) out of an error envelope.
fn envelope_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let error = value.get("error")?;
    let message = match error {
        Value::String(s) => Some(s.clone()),
        Value::Object(_) => error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    };
    message.filter(|m| !m.trim().is_empty())
}

/// Generic reason used when the body has no readable envelope.
fn status_message(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("request failed with HTTP {} ({reason})", status.as_u16()),
        None => format!("request failed with HTTP {}", status.as_u16()),
    }
}

/// Numeric `error.code` of an envelope, when it is a valid HTTP status.
fn envelope_status(body: &str) -> Option<u16> {
    let value: Value = serde_json::from_str(body).ok()?;
    let code = value.get("error")?.get("code")?.as_u64()?;
    u16::try_from(code)
        .ok()
        .filter(|code| StatusCode::from_u16(*code).is_ok())
}

fn wire_error(provider: ProviderId, status: StatusCode, body: &str) -> AiError {
    AiError::Wire {
        provider,
        status: status.as_u16(),
        message: envelope_message(body).unwrap_or_else(|| status_message(status)),
    }
}

/// Non-blank generated text, or a `Parse` error naming what was missing.
fn non_empty_text(provider: ProviderId, text: Option<String>, missing: &str) -> Result<String, AiError> {
    match text {
        Some(text) if !text.trim().is_empty() => Ok(text),
        Some(_) => Err(AiError::Parse {
            provider,
            message: "response text was empty".to_string(),
        }),
        None => Err(AiError::Parse {
            provider,
            message: missing.to_string(),
        }),
    }
}
