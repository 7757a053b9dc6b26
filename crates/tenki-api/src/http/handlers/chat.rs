//! Conversation endpoint.
//!
//! POST /chat
//!
//! Body: `{ messages, weather?, lang, stream }`. Buffered mode returns
//! `{ response, weather? }` with an `X-Model-Used` header; streaming mode
//! returns SSE where each event's data line is
//! `{"type":"weather"|"text"|"done","data"?:...}` -- the weather
//! side-payload (at most once) precedes all text fragments, and `done`
//! terminates the channel.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderName, HeaderValue};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::Instrument;

use tenki_core::chat::service::{ChatPrompt, ChatReply, StreamFrame};
use tenki_observe::genai_attrs as genai;
use tenki_types::chat::ConversationTurn;
use tenki_types::weather::{Locale, WeatherSnapshot};

use crate::http::error::AppError;
use crate::state::{AppState, ConcreteChatService};

/// Request body for the conversation endpoint.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ConversationTurn>,
    /// Snapshot the caller already holds from an earlier turn.
    #[serde(default)]
    pub weather: Option<WeatherSnapshot>,
    #[serde(default)]
    pub lang: Locale,
    #[serde(default)]
    pub stream: bool,
}

/// Buffered response body.
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather: Option<WeatherSnapshot>,
}

/// POST /chat -- buffered JSON or SSE streaming conversation turn.
pub async fn chat(
    State(state): State<AppState>,
    Json(body): Json<ChatRequest>,
) -> Result<Response, AppError> {
    let locale = body.lang;
    ConcreteChatService::validate(&body.messages).map_err(|e| AppError::Chat(e, locale))?;

    let prompt = ChatPrompt {
        history: body.messages,
        context_weather: body.weather,
        locale,
    };

    if body.stream {
        let frames = state.chat_service.clone().respond_stream(prompt);
        let sse_stream = frames.map(|frame| {
            let payload = match frame {
                StreamFrame::Weather(snapshot) => {
                    serde_json::json!({ "type": "weather", "data": snapshot })
                }
                StreamFrame::Text(text) => serde_json::json!({ "type": "text", "data": text }),
                StreamFrame::Done => serde_json::json!({ "type": "done" }),
            };
            Ok::<_, Infallible>(Event::default().data(payload.to_string()))
        });

        return Ok(Sse::new(sse_stream)
            .keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
            .into_response());
    }

    let span = tracing::info_span!(
        "chat",
        "gen_ai.operation.name" = genai::OP_CHAT,
        "gen_ai.provider.name" = genai::PROVIDER_GROQ,
        "gen_ai.response.model" = tracing::field::Empty,
    );

    let reply: ChatReply = state
        .chat_service
        .respond(prompt)
        .instrument(span.clone())
        .await
        .map_err(|e| AppError::Chat(e, locale))?;

    span.record(genai::GEN_AI_RESPONSE_MODEL, reply.model_id.as_str());

    let model_header = HeaderValue::from_str(&reply.model_id)
        .unwrap_or_else(|_| HeaderValue::from_static("unknown"));

    let mut response = Json(ChatResponse {
        response: reply.text,
        weather: reply.weather,
    })
    .into_response();
    response
        .headers_mut()
        .insert(HeaderName::from_static("x-model-used"), model_header);

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_defaults() {
        let body: ChatRequest = serde_json::from_str(
            r#"{"messages": [{"role": "user", "content": "京都の天気は？"}]}"#,
        )
        .unwrap();
        assert_eq!(body.lang, Locale::Ja);
        assert!(!body.stream);
        assert!(body.weather.is_none());
    }

    #[test]
    fn test_chat_response_omits_absent_weather() {
        let json = serde_json::to_string(&ChatResponse {
            response: "hi".to_string(),
            weather: None,
        })
        .unwrap();
        assert_eq!(json, r#"{"response":"hi"}"#);
    }
}
