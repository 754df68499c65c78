//! Axum route handlers for the AI API and the admin provider settings.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::ai::orchestrator::GenerateOptions;
use crate::ai::probe::{test_provider, ProbeResult};
use crate::ai::provider::ProviderId;
use crate::ai::settings::{ProviderConfig, SettingsDocument};
use crate::errors::AppError;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
    #[serde(flatten)]
    pub options: GenerateOptions,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub text: String,
    pub provider: ProviderId,
    pub model: String,
}

/// One provider's settings as shown to admins. The key itself never leaves
/// the server.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSettingsView {
    pub provider: ProviderId,
    pub has_key: bool,
    pub key_hint: Option<String>,
    pub model: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AiSettingsView {
    pub primary_provider: ProviderId,
    pub fallback_provider: ProviderId,
    pub second_fallback_provider: Option<ProviderId>,
    pub auto_fallback: bool,
    pub providers: Vec<ProviderSettingsView>,
}

/// Admin form submission. A `null`/omitted key keeps the stored key.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiSettingsUpdate {
    pub primary_provider: String,
    pub fallback_provider: String,
    #[serde(default)]
    pub second_fallback_provider: Option<String>,
    pub auto_fallback: bool,
    #[serde(default)]
    pub gemini_api_key: Option<String>,
    #[serde(default)]
    pub openrouter_api_key: Option<String>,
    #[serde(default)]
    pub groq_api_key: Option<String>,
    #[serde(default)]
    pub gemini_model: String,
    #[serde(default)]
    pub openrouter_model: String,
    #[serde(default)]
    pub groq_model: String,
}

/// Body of the connectivity check. `provider` stays a string so an unknown
/// identity is reported in the result instead of rejected by the extractor.
#[derive(Debug, Deserialize)]
pub struct ProbeRequest {
    pub provider: String,
    #[serde(default, alias = "apiKey")]
    pub api_key: String,
    #[serde(default)]
    pub model: String,
}

fn key_hint(key: &str) -> Option<String> {
    let key = key.trim();
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return None;
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    Some(format!("****{tail}"))
}

impl From<&ProviderConfig> for AiSettingsView {
    fn from(config: &ProviderConfig) -> Self {
        AiSettingsView {
            primary_provider: config.primary,
            fallback_provider: config.fallback1,
            second_fallback_provider: config.fallback2,
            auto_fallback: config.auto_fallback,
            providers: ProviderId::ALL
                .into_iter()
                .map(|provider| {
                    let credential = config.credential(provider);
                    ProviderSettingsView {
                        provider,
                        has_key: credential.has_key(),
                        key_hint: key_hint(&credential.api_key),
                        model: credential.model_for(provider).to_string(),
                    }
                })
                .collect(),
        }
    }
}

impl AiSettingsUpdate {
    /// Resolves the submission against the stored keys; `None` means no
    /// usable stored record, so omitted keys become blank.
    fn into_document(self, current: Option<&SettingsDocument>) -> SettingsDocument {
        let keep = |submitted: Option<String>, stored: Option<&String>| {
            submitted.or_else(|| stored.cloned()).unwrap_or_default()
        };
        SettingsDocument {
            primary_provider: self.primary_provider,
            fallback_provider: self.fallback_provider,
            second_fallback_provider: self.second_fallback_provider,
            auto_fallback: self.auto_fallback,
            gemini_api_key: keep(self.gemini_api_key, current.map(|doc| &doc.gemini_api_key)),
            openrouter_api_key: keep(self.openrouter_api_key, current.map(|doc| &doc.openrouter_api_key)),
            groq_api_key: keep(self.groq_api_key, current.map(|doc| &doc.groq_api_key)),
            gemini_model: self.gemini_model,
            openrouter_model: self.openrouter_model,
            groq_model: self.groq_model,
            updated_at: None,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/ai/generate
///
/// Runs a prompt through the configured provider chain.
pub async fn handle_generate(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, AppError> {
    if request.prompt.trim().is_empty() {
        return Err(AppError::Validation("prompt cannot be empty".to_string()));
    }

    let completion = state.ai.generate(&request.prompt, request.options).await?;

    Ok(Json(GenerateResponse {
        text: completion.text,
        provider: completion.provider,
        model: completion.model,
    }))
}

/// POST /api/v1/ai/generate-json
///
/// Same chain as `generate`, but the reply must be a JSON document; code
/// fences around it are stripped.
pub async fn handle_generate_json(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<Value>, AppError> {
    if request.prompt.trim().is_empty() {
        return Err(AppError::Validation("prompt cannot be empty".to_string()));
    }

    let value = state
        .ai
        .generate_json::<Value>(&request.prompt, request.options)
        .await?;
    Ok(Json(value))
}

/// GET /api/v1/admin/ai-settings
pub async fn handle_get_settings(
    State(state): State<AppState>,
) -> Result<Json<AiSettingsView>, AppError> {
    let config = state.settings.load().await?;
    Ok(Json(AiSettingsView::from(&*config)))
}

/// PUT /api/v1/admin/ai-settings
///
/// Persists new provider settings and invalidates the cached configuration.
pub async fn handle_update_settings(
    State(state): State<AppState>,
    Json(update): Json<AiSettingsUpdate>,
) -> Result<Json<AiSettingsView>, AppError> {
    // Read the raw record: a stored document with a bad identity must not
    // block the write that repairs it.
    let current = match state.settings.stored_document().await {
        Ok(doc) => Some(doc),
        Err(err) => {
            warn!(error = %err, "Stored AI settings unreadable, omitted keys will be blank");
            None
        }
    };
    let doc = update.into_document(current.as_ref());
    let config =
        ProviderConfig::try_from(&doc).map_err(|e| AppError::Validation(e.to_string()))?;

    state.settings.update(&config).await?;

    Ok(Json(AiSettingsView::from(&config)))
}

/// POST /api/v1/admin/ai-settings/test
///
/// Always 200; the outcome is in the body.
pub async fn handle_test_provider(
    State(state): State<AppState>,
    Json(request): Json<ProbeRequest>,
) -> Json<ProbeResult> {
    let provider = match request.provider.parse::<ProviderId>() {
        Ok(provider) => provider,
        Err(err) => {
            return Json(ProbeResult {
                success: false,
                message: err.to_string(),
            })
        }
    };

    Json(test_provider(state.backend.as_ref(), provider, &request.api_key, &request.model).await)
}
