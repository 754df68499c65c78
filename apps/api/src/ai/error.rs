use std::fmt;

use thiserror::Error;

use crate::ai::provider::{AttemptRole, ProviderId};
use crate::ai::store::StoreError;

/// Failure taxonomy of the AI invocation layer.
#[derive(Debug, Error)]
pub enum AiError {
    #[error("Prompt cannot be empty")]
    EmptyPrompt,

    /// Selected provider has no usable API key. Never reaches the network.
    #[error("{provider} API key is not configured")]
    MissingCredential { provider: ProviderId },

    /// Provider answered with a non-success status (or an error envelope).
    #[error("{provider} API error (status {status}): {message}")]
    Wire {
        provider: ProviderId,
        status: u16,
        message: String,
    },

    /// Success status, but no text could be extracted from the body.
    #[error("{provider} returned an unexpected response: {message}")]
    Parse {
        provider: ProviderId,
        message: String,
    },

    /// The request never produced an HTTP response.
    #[error("{provider} request failed: {source}")]
    Transport {
        provider: ProviderId,
        #[source]
        source: reqwest::Error,
    },

    #[error("{0}")]
    AllFailed(AggregatedFailure),

    #[error("Unknown AI provider '{0}' (expected gemini, openrouter or groq)")]
    UnknownProvider(String),

    #[error("Failed to access AI settings: {0}")]
    Settings(#[from] StoreError),
}

impl AiError {
    /// Failure reason without the provider prefix, for aggregated reports
    /// where the provider is already named.
    pub fn reason(&self) -> String {
        match self {
            AiError::MissingCredential { .. } => "API key is not configured".to_string(),
            AiError::Wire {
                status, message, ..
            } => format!("HTTP {status}: {message}"),
            AiError::Parse { message, .. } => format!("unexpected response: {message}"),
            AiError::Transport { source, .. } => format!("request failed: {source}"),
            other => other.to_string(),
        }
    }
}

/// One failed attempt inside a fallback chain.
#[derive(Debug, Clone)]
pub struct FailedAttempt {
    pub provider: ProviderId,
    pub role: AttemptRole,
    pub reason: String,
}

/// Every attempt of a `generate` call failed.
#[derive(Debug, Clone)]
pub struct AggregatedFailure {
    pub attempts: Vec<FailedAttempt>,
}

impl fmt::Display for AggregatedFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "All AI providers failed ({} attempts)", self.attempts.len())?;
        for attempt in &self.attempts {
            write!(
                f,
                "\n- {} ({}): {}",
                attempt.provider, attempt.role, attempt.reason
            )?;
        }
        Ok(())
    }
}
