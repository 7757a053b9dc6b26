//! Speech-to-text via Groq's hosted Whisper endpoint.
//!
//! Delegates verbatim: one multipart POST to `/audio/transcriptions`,
//! returning the transcript text. Not part of the conversation pipeline.

use serde::Deserialize;

use tenki_types::llm::CompletionError;
use tenki_types::weather::Locale;

/// Client for the hosted transcription service.
///
/// Uses a plain reqwest multipart upload; the chat side of the API goes
/// through `async_openai` instead.
pub struct GroqTranscriber {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

impl GroqTranscriber {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into(),
            model: model.into(),
        }
    }

    /// Transcribe an audio clip in the given locale's language.
    pub async fn transcribe(
        &self,
        audio: Vec<u8>,
        filename: &str,
        locale: Locale,
    ) -> Result<String, CompletionError> {
        let part = reqwest::multipart::Part::bytes(audio).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone())
            .text("language", locale.lang_code())
            .text("response_format", "json");

        let response = self
            .http
            .post(format!("{}/audio/transcriptions", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| CompletionError::Provider {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%status, "Transcription request rejected");
            return Err(match status.as_u16() {
                401 => CompletionError::AuthenticationFailed,
                429 => CompletionError::CapacityExceeded {
                    retry_after_ms: None,
                },
                _ => CompletionError::Provider {
                    message: format!("{status}: {body}"),
                },
            });
        }

        let body: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::Deserialization(e.to_string()))?;

        Ok(body.text)
    }
}
