//! Provider identities and the roles they can occupy in an attempt order.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ai::error::AiError;

/// One of the three supported generative-text vendors.
///
/// The set is closed: every dispatch over providers is an exhaustive `match`,
/// so adding a vendor is a compile-time change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Gemini,
    OpenRouter,
    Groq,
}

impl ProviderId {
    pub const ALL: [ProviderId; 3] = [ProviderId::Gemini, ProviderId::OpenRouter, ProviderId::Groq];

    /// Identifier used in the stored settings document.
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderId::Gemini => "gemini",
            ProviderId::OpenRouter => "openrouter",
            ProviderId::Groq => "groq",
        }
    }

    /// Human-readable vendor name used in log lines and error messages.
    pub fn display_name(self) -> &'static str {
        match self {
            ProviderId::Gemini => "Gemini",
            ProviderId::OpenRouter => "OpenRouter",
            ProviderId::Groq => "Groq",
        }
    }

    /// Model used when neither the environment nor the settings document names one.
    pub fn default_model(self) -> &'static str {
        match self {
            ProviderId::Gemini => "gemini-2.0-flash",
            ProviderId::OpenRouter => "meta-llama/llama-3.3-70b-instruct:free",
            ProviderId::Groq => "llama-3.3-70b-versatile",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ProviderId {
    type Err = AiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(ProviderId::Gemini),
            "openrouter" => Ok(ProviderId::OpenRouter),
            "groq" => Ok(ProviderId::Groq),
            _ => Err(AiError::UnknownProvider(s.to_string())),
        }
    }
}

/// Position a provider occupied in a single `generate` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptRole {
    Primary,
    Fallback1,
    Fallback2,
    /// The caller named the provider explicitly.
    Forced,
}

impl fmt::Display for AttemptRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AttemptRole::Primary => "primary",
            AttemptRole::Fallback1 => "1st fallback",
            AttemptRole::Fallback2 => "2nd fallback",
            AttemptRole::Forced => "forced",
        };
        f.write_str(label)
    }
}
