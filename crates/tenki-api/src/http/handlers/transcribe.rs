//! Speech-to-text endpoint.
//!
//! POST /transcribe
//!
//! Multipart body with an `audio` file and an optional `lang` field;
//! delegates verbatim to the hosted transcription service.

use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;

use tenki_types::weather::Locale;

use crate::http::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct TranscribeResponse {
    pub text: String,
}

/// POST /transcribe -- transcribe an uploaded audio clip.
pub async fn transcribe(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<TranscribeResponse>, AppError> {
    let mut audio: Option<(String, Vec<u8>)> = None;
    let mut locale = Locale::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.to_string()))?
    {
        match field.name() {
            Some("audio") => {
                let filename = field.file_name().unwrap_or("audio.webm").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(e.to_string()))?;
                audio = Some((filename, bytes.to_vec()));
            }
            Some("lang") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(e.to_string()))?;
                locale = value.parse().unwrap_or_default();
            }
            _ => {}
        }
    }

    let Some((filename, bytes)) = audio else {
        return Err(AppError::Validation("No audio file".to_string()));
    };

    let text = state
        .transcriber
        .transcribe(bytes, &filename, locale)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Transcription failed");
            AppError::Internal("Transcription failed".to_string())
        })?;

    Ok(Json(TranscribeResponse { text }))
}
