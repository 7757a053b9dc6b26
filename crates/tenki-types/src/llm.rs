//! Completion request/response types.
//!
//! These types model the interaction with the hosted completion service:
//! requests carrying a transcript and an optional tool schema, responses
//! carrying generated text and/or structured tool-call requests, streaming
//! events, and the error taxonomy that drives the fallback cascade.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::chat::ConversationTurn;

/// Request to the completion service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    pub turns: Vec<ConversationTurn>,
    /// Tool schema offered to the model; `None` disables tool use entirely.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolSpec>>,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub stream: bool,
}

/// A non-streaming completion from the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Completion {
    pub id: String,
    pub model: String,
    /// Generated text; empty when the model answered with a tool call only.
    pub text: String,
    /// Structured tool-call requests, in the order the model emitted them.
    #[serde(default)]
    pub tool_calls: Vec<ToolCallRequest>,
    pub stop_reason: StopReason,
}

/// A structured request from the model to invoke a capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    /// Raw JSON argument payload, parsed lazily by the resolution pipeline.
    pub arguments: String,
}

/// Schema for a capability offered to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON Schema for the arguments object.
    pub parameters: serde_json::Value,
}

/// Reason the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::EndTurn => write!(f, "end_turn"),
            StopReason::ToolUse => write!(f, "tool_use"),
            StopReason::MaxTokens => write!(f, "max_tokens"),
        }
    }
}

impl FromStr for StopReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "end_turn" => Ok(StopReason::EndTurn),
            "tool_use" => Ok(StopReason::ToolUse),
            "max_tokens" => Ok(StopReason::MaxTokens),
            other => Err(format!("invalid stop reason: '{other}'")),
        }
    }
}

/// Events emitted during a streaming completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Connection established with the provider.
    Connected,

    /// A fragment of generated text.
    TextDelta { text: String },

    /// A tool call has been fully received (arguments reassembled).
    ToolCallComplete {
        id: String,
        name: String,
        arguments: String,
    },

    /// The message is finishing with a stop reason.
    MessageDelta { stop_reason: StopReason },

    /// The stream has completed.
    Done,
}

/// Errors from the completion service, classified for fallback routing.
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    /// Provider signalled overload or rate limiting; triggers tier fallback.
    #[error("provider capacity exceeded (retry after {retry_after_ms:?}ms)")]
    CapacityExceeded { retry_after_ms: Option<u64> },

    /// Provider rejected the request shape (usually the tool schema).
    #[error("tool schema rejected: {0}")]
    SchemaRejected(String),

    /// The requested model does not exist or is not served.
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("stream error: {0}")]
    Stream(String),

    #[error("provider error: {message}")]
    Provider { message: String },
}
