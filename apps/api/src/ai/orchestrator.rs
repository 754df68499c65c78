//! Fallback orchestrator — the single entry point feature code uses to get
//! text out of a model.
//!
//! Providers are tried strictly one after another in the configured order
//! (primary, 1st fallback, 2nd fallback). The first success wins; if every
//! permitted attempt fails the caller gets one `AllFailed` error listing each
//! attempt. No attempt is started before the previous one has settled.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::ai::cache::ConfigCache;
use crate::ai::clients::{Completion, ProviderBackend};
use crate::ai::error::{AggregatedFailure, AiError, FailedAttempt};
use crate::ai::provider::{AttemptRole, ProviderId};
use crate::ai::settings::ProviderConfig;

/// Per-call overrides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct GenerateOptions {
    /// Call exactly this provider, ignoring the configured order and never
    /// falling back.
    #[serde(default)]
    pub force_provider: Option<ProviderId>,
    /// Call only the configured primary.
    #[serde(default)]
    pub skip_fallback: bool,
}

#[cfg(test)]
impl GenerateOptions {
    pub fn forced(provider: ProviderId) -> Self {
        Self {
            force_provider: Some(provider),
            skip_fallback: false,
        }
    }
}

/// Position in the fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    TryingPrimary,
    TryingFallback1,
    TryingFallback2(ProviderId),
}

impl Stage {
    fn role(self) -> AttemptRole {
        match self {
            Stage::TryingPrimary => AttemptRole::Primary,
            Stage::TryingFallback1 => AttemptRole::Fallback1,
            Stage::TryingFallback2(_) => AttemptRole::Fallback2,
        }
    }

    fn provider(self, config: &ProviderConfig) -> ProviderId {
        match self {
            Stage::TryingPrimary => config.primary,
            Stage::TryingFallback1 => config.fallback1,
            Stage::TryingFallback2(provider) => provider,
        }
    }

    /// Stage entered after this one fails; `None` means all attempts are spent.
    fn next(self, config: &ProviderConfig) -> Option<Stage> {
        match self {
            Stage::TryingPrimary => Some(Stage::TryingFallback1),
            Stage::TryingFallback1 => config.fallback2.map(Stage::TryingFallback2),
            Stage::TryingFallback2(_) => None,
        }
    }
}

#[derive(Clone)]
pub struct Orchestrator {
    settings: Arc<ConfigCache>,
    backend: Arc<dyn ProviderBackend>,
}

impl Orchestrator {
    pub fn new(settings: Arc<ConfigCache>, backend: Arc<dyn ProviderBackend>) -> Self {
        Self { settings, backend }
    }

    pub async fn generate(
        &self,
        prompt: &str,
        options: GenerateOptions,
    ) -> Result<Completion, AiError> {
        if prompt.trim().is_empty() {
            return Err(AiError::EmptyPrompt);
        }

        let config = self.settings.load().await?;

        if let Some(provider) = options.force_provider {
            debug!(%provider, "Calling forced AI provider");
            return self
                .backend
                .call(provider, prompt, &config)
                .await
                .map_err(|err| {
                    warn!(%provider, role = %AttemptRole::Forced, error = %err, "AI provider attempt failed");
                    err
                });
        }

        let may_fall_back = config.auto_fallback && !options.skip_fallback;
        let mut failures: Vec<FailedAttempt> = Vec::new();
        let mut stage = Stage::TryingPrimary;

        loop {
            let provider = stage.provider(&config);
            let role = stage.role();
            debug!(%provider, %role, "Attempting AI provider");

            match self.backend.call(provider, prompt, &config).await {
                Ok(completion) => {
                    if !failures.is_empty() {
                        info!(
                            %provider,
                            %role,
                            failed_attempts = failures.len(),
                            "AI request served by fallback provider"
                        );
                    }
                    return Ok(completion);
                }
                Err(err) => {
                    warn!(%provider, %role, error = %err, "AI provider attempt failed");

                    // Single permitted attempt: the caller sees the original error.
                    if stage == Stage::TryingPrimary && !may_fall_back {
                        return Err(err);
                    }

                    failures.push(FailedAttempt {
                        provider,
                        role,
                        reason: err.reason(),
                    });

                    match stage.next(&config) {
                        Some(next) => stage = next,
                        None => break,
                    }
                }
            }
        }

        Err(AiError::AllFailed(AggregatedFailure { attempts: failures }))
    }

    /// Like `generate`, but deserializes the response text as JSON.
    /// The prompt must instruct the model to return valid JSON.
    pub async fn generate_json<T: DeserializeOwned>(
        &self,
        prompt: &str,
        options: GenerateOptions,
    ) -> Result<T, AiError> {
        let completion = self.generate(prompt, options).await?;
        let text = strip_json_fences(&completion.text);
        serde_json::from_str(text).map_err(|e| AiError::Parse {
            provider: completion.provider,
            message: format!("response was not the expected JSON: {e}"),
        })
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let inner = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"));
    match inner {
        Some(stripped) => {
            let stripped = stripped.trim_start();
            stripped
                .strip_suffix("```")
                .map(str::trim)
                .unwrap_or(stripped)
        }
        None => text,
    }
}
