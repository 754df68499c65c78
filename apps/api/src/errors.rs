use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::ai::AiError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("AI error: {0}")]
    Ai(#[from] AiError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Ai(AiError::EmptyPrompt) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                AiError::EmptyPrompt.to_string(),
            ),
            AppError::Ai(e @ AiError::UnknownProvider(_)) => {
                tracing::error!("AI configuration error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "AI_CONFIG_ERROR",
                    e.to_string(),
                )
            }
            AppError::Ai(AiError::Settings(e)) => {
                tracing::error!("Settings store error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "SETTINGS_ERROR",
                    "AI settings are currently unavailable".to_string(),
                )
            }
            // Provider failures carry the per-attempt breakdown operators need.
            AppError::Ai(e) => {
                tracing::error!("AI provider error: {e}");
                (StatusCode::BAD_GATEWAY, "AI_PROVIDER_ERROR", e.to_string())
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
