//! OpenAI-style chat-completion wire types shared by OpenRouter and Groq.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{envelope_status, non_empty_text, wire_error, GenerationParams};
use crate::ai::error::AiError;
use crate::ai::provider::ProviderId;

#[derive(Debug, Serialize)]
pub(super) struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage<'a>>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl<'a> ChatRequest<'a> {
    /// Body with the prompt as the single user message.
    pub fn user_prompt(model: &'a str, prompt: &'a str, params: &GenerationParams) -> Self {
        Self {
            model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: params.temperature,
            max_tokens: params.max_output_tokens,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct ChatMessage<'a> {
    pub role: &'a str,
    pub content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    model: Option<String>,
    /// OpenRouter can report upstream failures inside a 200 body.
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Generated text plus the model the vendor reports having used.
#[derive(Debug)]
pub(super) struct ChatOutput {
    pub text: String,
    pub model: Option<String>,
}

/// Parses a 2xx chat-completion body.
pub(super) fn parse_completion(
    provider: ProviderId,
    status: StatusCode,
    body: &str,
) -> Result<ChatOutput, AiError> {
    let parsed: ChatCompletionResponse =
        serde_json::from_str(body).map_err(|e| AiError::Parse {
            provider,
            message: format!("invalid JSON body: {e}"),
        })?;

    if parsed.error.is_some() {
        // The envelope's own code is the upstream status; the 200 is OpenRouter's.
        let status = envelope_status(body)
            .and_then(|code| StatusCode::from_u16(code).ok())
            .unwrap_or(status);
        return Err(wire_error(provider, status, body));
    }

    let text = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content);

    Ok(ChatOutput {
        text: non_empty_text(provider, text, "response had no choices[0].message.content")?,
        model: parsed.model.filter(|m| !m.is_empty()),
    })
}
