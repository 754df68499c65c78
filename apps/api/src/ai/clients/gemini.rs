//! Gemini `generateContent` client. The key travels in the query string.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{non_empty_text, require_key, send, wire_error, Completion, GenerationParams};
use crate::ai::error::AiError;
use crate::ai::provider::ProviderId;
use crate::ai::settings::ProviderConfig;

const PROVIDER: ProviderId = ProviderId::Gemini;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// `candidates[0].content.parts[0].text`
    fn into_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .text
    }
}

#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    base_url: String,
    params: GenerationParams,
}

impl GeminiClient {
    pub fn new(http: Client, base_url: String, params: GenerationParams) -> Self {
        Self {
            http,
            base_url,
            params,
        }
    }

    fn url(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            model
        )
    }

    pub async fn call(&self, prompt: &str, config: &ProviderConfig) -> Result<Completion, AiError> {
        let api_key = require_key(PROVIDER, config)?;
        let model = config.credential(PROVIDER).model_for(PROVIDER);

        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.params.temperature,
                top_k: self.params.top_k,
                top_p: self.params.top_p,
                max_output_tokens: self.params.max_output_tokens,
            },
        };

        let request = self
            .http
            .post(self.url(model))
            .query(&[("key", api_key)])
            .json(&body);

        let (status, text) = send(PROVIDER, request).await?;
        if !status.is_success() {
            return Err(wire_error(PROVIDER, status, &text));
        }

        let parsed: GenerateContentResponse =
            serde_json::from_str(&text).map_err(|e| AiError::Parse {
                provider: PROVIDER,
                message: format!("invalid JSON body: {e}"),
            })?;

        let block_reason = parsed
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.clone());
        let missing = match block_reason {
            Some(reason) => format!("no candidate text (prompt blocked: {reason})"),
            None => "response had no candidates[0].content.parts[0].text".to_string(),
        };
        let text = non_empty_text(PROVIDER, parsed.into_text(), &missing)?;

        debug!("Gemini call succeeded (model: {model}, {} chars)", text.len());

        Ok(Completion {
            provider: PROVIDER,
            model: model.to_string(),
            text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::settings::{Credential, Credentials};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MODEL_PATH: &str = "/v1beta/models/gemini-2.0-flash:generateContent";

    fn client(server: &MockServer) -> GeminiClient {
        GeminiClient::new(Client::new(), server.uri(), GenerationParams::default())
    }

    fn config_with_key(key: &str) -> ProviderConfig {
        ProviderConfig::single(PROVIDER, Credential::new(key, "gemini-2.0-flash"))
    }

    #[tokio::test]
    async fn test_success_extracts_first_candidate_part() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .and(query_param("key", "AIza-good"))
            .and(body_partial_json(json!({
                "contents": [{"parts": [{"text": "Say hi"}]}],
                "generationConfig": {"topK": 40, "maxOutputTokens": 2048}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": {"parts": [{"text": "Hi!"}, {"text": "extra"}], "role": "model"},
                    "finishReason": "STOP"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let completion = client(&server)
            .call("Say hi", &config_with_key("AIza-good"))
            .await
            .unwrap();
        assert_eq!(completion.provider, ProviderId::Gemini);
        assert_eq!(completion.model, "gemini-2.0-flash");
        assert_eq!(completion.text, "Hi!");
    }

    #[tokio::test]
    async fn test_missing_key_never_touches_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        // Every other provider has a key; Gemini does not.
        let config = ProviderConfig::defaults(Credentials::from_keys("", "or-key", "gsk-key"));
        let err = client(&server).call("Say hi", &config).await.unwrap_err();
        assert!(matches!(err, AiError::MissingCredential { provider: ProviderId::Gemini }));
    }

    #[tokio::test]
    async fn test_error_envelope_message_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"code": 400, "message": "API key not valid. Please pass a valid API key.", "status": "INVALID_ARGUMENT"}
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .call("Say hi", &config_with_key("AIza-bad"))
            .await
            .unwrap_err();
        match err {
            AiError::Wire { status, message, .. } => {
                assert_eq!(status, 400);
                assert_eq!(message, "API key not valid. Please pass a valid API key.");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_candidate_is_a_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "promptFeedback": {"blockReason": "SAFETY"}
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .call("Say hi", &config_with_key("AIza-good"))
            .await
            .unwrap_err();
        assert!(matches!(err, AiError::Parse { ref message, .. } if message.contains("SAFETY")));
    }

    #[tokio::test]
    async fn test_connection_failure_is_transport_error() {
        let client = GeminiClient::new(
            Client::new(),
            "http://127.0.0.1:1".to_string(),
            GenerationParams::default(),
        );
        let err = client
            .call("Say hi", &config_with_key("AIza-good"))
            .await
            .unwrap_err();
        assert!(matches!(err, AiError::Transport { provider: ProviderId::Gemini, .. }));
    }

    #[tokio::test]
    async fn test_transport_error_does_not_expose_api_key() {
        let client = GeminiClient::new(
            Client::new(),
            "http://127.0.0.1:1".to_string(),
            GenerationParams::default(),
        );
        let err = client
            .call("Say hi", &config_with_key("AIza-TOPSECRET"))
            .await
            .unwrap_err();
        assert!(!err.to_string().contains("AIza-TOPSECRET"), "{err}");
        assert!(!err.reason().contains("AIza-TOPSECRET"));
        assert!(!format!("{err:?}").contains("AIza-TOPSECRET"));
    }

    #[tokio::test]
    async fn test_blank_model_calls_default_model() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"content": {"parts": [{"text": "Hi!"}]}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let config = ProviderConfig::single(PROVIDER, Credential::new("AIza-good", "  "));
        let completion = client(&server).call("Say hi", &config).await.unwrap();
        assert_eq!(completion.model, "gemini-2.0-flash");
    }
}
