//! Application error type mapping to HTTP status codes.
//!
//! Error bodies are plain `{"error": "..."}` objects. A pipeline
//! `CompletionUnavailable` is the only domain error that surfaces to the
//! user, carrying the locale-appropriate apology with a 503; raw provider
//! errors never leave the service.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use tenki_types::error::ChatError;
use tenki_types::weather::Locale;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Pipeline error, carrying the request locale for the apology text.
    Chat(ChatError, Locale),
    /// Bad request parameters or body.
    Validation(String),
    /// Lookup miss on the standalone weather endpoint.
    NotFound(String),
    /// Generic internal error.
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Chat(ChatError::CompletionUnavailable, locale) => (
                StatusCode::SERVICE_UNAVAILABLE,
                locale.apology().to_string(),
            ),
            AppError::Chat(ChatError::EmptyMessage, _) => (
                StatusCode::BAD_REQUEST,
                ChatError::EmptyMessage.to_string(),
            ),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, axum::Json(json!({ "error": message }))).into_response()
    }
}
