//! OpenRouter chat-completions client.

use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use super::chat::{parse_completion, ChatRequest};
use super::{require_key, send, wire_error, Attribution, Completion, GenerationParams};
use crate::ai::error::AiError;
use crate::ai::provider::ProviderId;
use crate::ai::settings::ProviderConfig;

const PROVIDER: ProviderId = ProviderId::OpenRouter;
const FREE_SUFFIX: &str = ":free";
pub const PRIVACY_SETTINGS_URL: &str = "https://openrouter.ai/settings/privacy";

#[derive(Debug, Serialize)]
struct OpenRouterRequest<'a> {
    #[serde(flatten)]
    chat: ChatRequest<'a>,
    /// Ordered route list; lets a `:free` model fall through to its paid tier.
    #[serde(skip_serializing_if = "Option::is_none")]
    models: Option<Vec<&'a str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    provider: Option<RoutingPreferences>,
}

#[derive(Debug, Serialize)]
struct RoutingPreferences {
    allow_fallbacks: bool,
}

impl<'a> OpenRouterRequest<'a> {
    fn new(model: &'a str, prompt: &'a str, params: &GenerationParams) -> Self {
        let models = model
            .strip_suffix(FREE_SUFFIX)
            .filter(|paid| !paid.is_empty())
            .map(|paid| vec![model, paid]);
        let provider = models.as_ref().map(|_| RoutingPreferences {
            allow_fallbacks: true,
        });
        Self {
            chat: ChatRequest::user_prompt(model, prompt, params),
            models,
            provider,
        }
    }
}

/// Data-policy rejections ("No endpoints found matching your data policy")
/// are fixed in the account's privacy settings, not by retrying.
fn is_privacy_rejection(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("no endpoints found")
        || lower.contains("data policy")
        || lower.contains("privacy")
}

fn privacy_message(model: &str, upstream: &str) -> String {
    format!(
        "OpenRouter has no endpoint for model '{model}' that matches your account's data policy. \
         Enable the required model-training/free endpoints in your OpenRouter privacy settings \
         ({PRIVACY_SETTINGS_URL}) or choose a different model. Upstream message: {upstream}"
    )
}

/// Rewrites data-policy rejections into an actionable message.
fn translate(model: &str, err: AiError) -> AiError {
    match err {
        AiError::Wire {
            provider,
            status,
            message,
        } if is_privacy_rejection(&message) => AiError::Wire {
            provider,
            status,
            message: privacy_message(model, &message),
        },
        other => other,
    }
}

#[derive(Clone)]
pub struct OpenRouterClient {
    http: Client,
    base_url: String,
    attribution: Attribution,
    params: GenerationParams,
}

impl OpenRouterClient {
    pub fn new(
        http: Client,
        base_url: String,
        attribution: Attribution,
        params: GenerationParams,
    ) -> Self {
        Self {
            http,
            base_url,
            attribution,
            params,
        }
    }

    fn url(&self) -> String {
        format!(
            "{}/api/v1/chat/completions",
            self.base_url.trim_end_matches('/')
        )
    }


    pub async fn call(&self, prompt: &str, config: &ProviderConfig) -> Result<Completion, AiError> {
        let api_key = require_key(PROVIDER, config)?;
        let model = config.credential(PROVIDER).model_for(PROVIDER);

        let request = self
            .http
            .post(self.url())
            .bearer_auth(api_key)
            .header("HTTP-Referer", &self.attribution.referer)
            .header("X-Title", &self.attribution.title)
            .json(&OpenRouterRequest::new(model, prompt, &self.params));

        let (status, text) = send(PROVIDER, request).await?;
        if !status.is_success() {
            return Err(translate(model, wire_error(PROVIDER, status, &text)));
        }

        let output =
            parse_completion(PROVIDER, status, &text).map_err(|err| translate(model, err))?;

        let model_used = output.model.unwrap_or_else(|| model.to_string());
        debug!("OpenRouter call succeeded (model: {model_used})");

        Ok(Completion {
            provider: PROVIDER,
            model: model_used,
            text: output.text,
        })
    }
}
