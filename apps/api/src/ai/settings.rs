//! Provider preference settings: the in-process `ProviderConfig` value and
//! the `SettingsDocument` shape it is persisted as.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ai::error::AiError;
use crate::ai::provider::ProviderId;

/// API key and model for one provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credential {
    pub api_key: String,
    pub model: String,
}

impl Credential {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    /// A whitespace-only key counts as absent.
    pub fn has_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// Model to call; a blank model means the provider's default.
    pub fn model_for(&self, provider: ProviderId) -> &str {
        match self.model.trim() {
            "" => provider.default_model(),
            model => model,
        }
    }
}

/// Per-provider credentials. Field access goes through `get`, an exhaustive
/// match over `ProviderId`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub gemini: Credential,
    pub openrouter: Credential,
    pub groq: Credential,
}

impl Credentials {
    /// Builds credentials from bare keys, pairing each with its default model.
    pub fn from_keys(gemini_key: &str, openrouter_key: &str, groq_key: &str) -> Self {
        Self {
            gemini: Credential::new(gemini_key, ProviderId::Gemini.default_model()),
            openrouter: Credential::new(openrouter_key, ProviderId::OpenRouter.default_model()),
            groq: Credential::new(groq_key, ProviderId::Groq.default_model()),
        }
    }

    pub fn get(&self, provider: ProviderId) -> &Credential {
        match provider {
            ProviderId::Gemini => &self.gemini,
            ProviderId::OpenRouter => &self.openrouter,
            ProviderId::Groq => &self.groq,
        }
    }

    pub fn get_mut(&mut self, provider: ProviderId) -> &mut Credential {
        match provider {
            ProviderId::Gemini => &mut self.gemini,
            ProviderId::OpenRouter => &mut self.openrouter,
            ProviderId::Groq => &mut self.groq,
        }
    }
}

/// Snapshot of the provider preferences used for one `generate` call.
///
/// `primary`, `fallback1` and `fallback2` may repeat a provider; a repeated
/// provider is simply tried again under its next role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub primary: ProviderId,
    pub fallback1: ProviderId,
    pub fallback2: Option<ProviderId>,
    pub auto_fallback: bool,
    pub credentials: Credentials,
}

impl ProviderConfig {
    /// Configuration served when no settings document has been saved yet:
    /// Gemini, then Groq, then OpenRouter, with automatic fallback on.
    pub fn defaults(credentials: Credentials) -> Self {
        Self {
            primary: ProviderId::Gemini,
            fallback1: ProviderId::Groq,
            fallback2: Some(ProviderId::OpenRouter),
            auto_fallback: true,
            credentials,
        }
    }

    /// Throwaway configuration naming a single provider, used by the
    /// connectivity probe. Other providers keep empty credentials.
    pub fn single(provider: ProviderId, credential: Credential) -> Self {
        let mut credentials = Credentials::default();
        *credentials.get_mut(provider) = credential;
        Self {
            primary: provider,
            fallback1: provider,
            fallback2: None,
            auto_fallback: false,
            credentials,
        }
    }

    pub fn credential(&self, provider: ProviderId) -> &Credential {
        self.credentials.get(provider)
    }
}

/// Persisted form of the settings, one record in the settings store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsDocument {
    pub primary_provider: String,
    pub fallback_provider: String,
    #[serde(default)]
    pub second_fallback_provider: Option<String>,
    #[serde(default = "default_auto_fallback")]
    pub auto_fallback: bool,
    #[serde(default)]
    pub gemini_api_key: String,
    #[serde(default)]
    pub openrouter_api_key: String,
    #[serde(default)]
    pub groq_api_key: String,
    #[serde(default)]
    pub gemini_model: String,
    #[serde(default)]
    pub openrouter_model: String,
    #[serde(default)]
    pub groq_model: String,
    /// Assigned by the store on write; not part of the document body.
    #[serde(skip)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_auto_fallback() -> bool {
    true
}

fn parse_optional_provider(value: Option<&str>) -> Result<Option<ProviderId>, AiError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) if v.eq_ignore_ascii_case("none") => Ok(None),
        Some(v) => v.parse().map(Some),
    }
}


impl TryFrom<&SettingsDocument> for ProviderConfig {
    type Error = AiError;

    fn try_from(doc: &SettingsDocument) -> Result<Self, Self::Error> {
        Ok(ProviderConfig {
            primary: doc.primary_provider.parse()?,
            fallback1: doc.fallback_provider.parse()?,
            fallback2: parse_optional_provider(doc.second_fallback_provider.as_deref())?,
            auto_fallback: doc.auto_fallback,
            credentials: Credentials {
                gemini: Credential::new(&doc.gemini_api_key, &doc.gemini_model),
                openrouter: Credential::new(&doc.openrouter_api_key, &doc.openrouter_model),
                groq: Credential::new(&doc.groq_api_key, &doc.groq_model),
            },
        })
    }
}

impl From<&ProviderConfig> for SettingsDocument {
    fn from(config: &ProviderConfig) -> Self {
        let creds = &config.credentials;
        SettingsDocument {
            primary_provider: config.primary.as_str().to_string(),
            fallback_provider: config.fallback1.as_str().to_string(),
            second_fallback_provider: config.fallback2.map(|p| p.as_str().to_string()),
            auto_fallback: config.auto_fallback,
            gemini_api_key: creds.gemini.api_key.clone(),
            openrouter_api_key: creds.openrouter.api_key.clone(),
            groq_api_key: creds.groq.api_key.clone(),
            gemini_model: creds.gemini.model.clone(),
            openrouter_model: creds.openrouter.model.clone(),
            groq_model: creds.groq.model.clone(),
            updated_at: None,
        }
    }
}
