//! Connectivity probe for the admin settings form: checks one credential/model
//! pair against its provider without touching the cached configuration.

use serde::Serialize;
use tracing::{info, warn};

use crate::ai::clients::ProviderBackend;
use crate::ai::provider::ProviderId;
use crate::ai::settings::{Credential, ProviderConfig};

pub const PROBE_PROMPT: &str = "Reply with exactly: Connection successful";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeResult {
    pub success: bool,
    pub message: String,
}

/// Calls `provider` once with a canned prompt. Never fails: every error
/// becomes `success: false` with the error text as the message.
pub async fn test_provider(
    backend: &dyn ProviderBackend,
    provider: ProviderId,
    api_key: &str,
    model: &str,
) -> ProbeResult {
    let model = match model.trim() {
        "" => provider.default_model(),
        m => m,
    };
    let config = ProviderConfig::single(provider, Credential::new(api_key, model));

    match backend.call(provider, PROBE_PROMPT, &config).await {
        Ok(completion) => {
            info!(%provider, model = %completion.model, "Connectivity probe succeeded");
            ProbeResult {
                success: true,
                message: format!(
                    "Connected to {provider} using model {}. Response: {}",
                    completion.model,
                    completion.text.trim()
                ),
            }
        }
        Err(err) => {
            warn!(%provider, %model, error = %err, "Connectivity probe failed");
            ProbeResult {
                success: false,
                message: err.to_string(),
            }
        }
    }
}
