//! Groq chat-completions client (OpenAI-compatible endpoint).

use reqwest::{Client, StatusCode};
use tracing::debug;

use super::chat::{parse_completion, ChatRequest};
use super::{require_key, send, wire_error, Completion, GenerationParams};
use crate::ai::error::AiError;
use crate::ai::provider::ProviderId;
use crate::ai::settings::ProviderConfig;

const PROVIDER: ProviderId = ProviderId::Groq;

#[derive(Clone)]
pub struct GroqClient {
    http: Client,
    base_url: String,
    params: GenerationParams,
}

impl GroqClient {
    pub fn new(http: Client, base_url: String, params: GenerationParams) -> Self {
        Self {
            http,
            base_url,
            params,
        }
    }

    fn url(&self) -> String {
        format!(
            "{}/openai/v1/chat/completions",
            self.base_url.trim_end_matches('/')
        )
    }

    pub async fn call(&self, prompt: &str, config: &ProviderConfig) -> Result<Completion, AiError> {
        // Keys pasted from the console often carry a trailing newline.
        let api_key = require_key(PROVIDER, config)?.trim();
        let model = config.credential(PROVIDER).model_for(PROVIDER);

        let request = self
            .http
            .post(self.url())
            .bearer_auth(api_key)
            .json(&ChatRequest::user_prompt(model, prompt, &self.params));

        let (status, text) = send(PROVIDER, request).await?;
        if status == StatusCode::UNAUTHORIZED {
            return Err(AiError::Wire {
                provider: PROVIDER,
                status: status.as_u16(),
                message: "Invalid Groq API key. Re-check the key in the AI settings: \
                          it may be mistyped, revoked, or pasted with extra characters."
                    .to_string(),
            });
        }
        if !status.is_success() {
            return Err(wire_error(PROVIDER, status, &text));
        }

        let output = parse_completion(PROVIDER, status, &text)?;
        debug!("Groq call succeeded (model: {model})");

        Ok(Completion {
            provider: PROVIDER,
            model: output.model.unwrap_or_else(|| model.to_string()),
            text: output.text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::settings::{Credential, Credentials};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const COMPLETIONS_PATH: &str = "/openai/v1/chat/completions";

    fn client(server: &MockServer) -> GroqClient {
        GroqClient::new(Client::new(), server.uri(), GenerationParams::default())
    }

    fn config(key: &str) -> ProviderConfig {
        ProviderConfig::single(PROVIDER, Credential::new(key, "llama-3.3-70b-versatile"))
    }

    #[tokio::test]
    async fn test_key_is_trimmed_before_use() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(COMPLETIONS_PATH))
            .and(header("authorization", "Bearer gsk_abc123"))
            .and(body_partial_json(json!({
                "model": "llama-3.3-70b-versatile",
                "messages": [{"role": "user", "content": "Say hi"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "Hi from Groq"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let completion = client(&server)
            .call("Say hi", &config("  gsk_abc123\n"))
            .await
            .unwrap();
        assert_eq!(completion.provider, ProviderId::Groq);
        assert_eq!(completion.model, "llama-3.3-70b-versatile");
        assert_eq!(completion.text, "Hi from Groq");
    }

    #[tokio::test]
    async fn test_missing_key_never_touches_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let config = ProviderConfig::defaults(Credentials::from_keys("AIza", "sk-or", " \t"));
        let err = client(&server).call("Say hi", &config).await.unwrap_err();
        assert!(matches!(err, AiError::MissingCredential { provider: ProviderId::Groq }));
    }

    #[tokio::test]
    async fn test_unauthorized_suggests_rechecking_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(COMPLETIONS_PATH))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {"message": "Invalid API Key", "type": "invalid_request_error", "code": "invalid_api_key"}
            })))
            .mount(&server)
            .await;

        let err = client(&server).call("Say hi", &config("gsk_bad")).await.unwrap_err();
        match err {
            AiError::Wire { status, message, .. } => {
                assert_eq!(status, 401);
                assert!(message.contains("Re-check the key"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rate_limit_uses_envelope_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(COMPLETIONS_PATH))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": {"message": "Rate limit reached for model", "type": "tokens"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server).call("Say hi", &config("gsk_1")).await.unwrap_err();
        assert!(matches!(err, AiError::Wire { status: 429, ref message, .. } if message == "Rate limit reached for model"));
    }
}
