//! Conversation transcript types.
//!
//! A conversation is an ordered sequence of [`ConversationTurn`]s owned by a
//! single request. Turns are never persisted; each pipeline stage that needs
//! to extend the transcript returns a new, longer copy.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::llm::ToolCallRequest;

/// Role of a turn in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    System,
    User,
    Assistant,
    Tool,
}

impl fmt::Display for TurnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnRole::System => write!(f, "system"),
            TurnRole::User => write!(f, "user"),
            TurnRole::Assistant => write!(f, "assistant"),
            TurnRole::Tool => write!(f, "tool"),
        }
    }
}

impl FromStr for TurnRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "system" => Ok(TurnRole::System),
            "user" => Ok(TurnRole::User),
            "assistant" => Ok(TurnRole::Assistant),
            "tool" => Ok(TurnRole::Tool),
            other => Err(format!("invalid turn role: '{other}'")),
        }
    }
}

/// A single turn in a conversation transcript.
///
/// `tool_call_id` links a `Tool` turn back to the call that produced it.
/// `tool_calls` is only populated on an assistant turn that initiated a
/// capability invocation; the completion protocol requires the call to be
/// echoed ahead of its result. Both fields are omitted from the wire when
/// empty, so the inbound API shape stays `{ role, content }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRequest>,
}

impl ConversationTurn {
    /// A system-role turn.
    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(TurnRole::System, content)
    }

    /// A user-role turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(TurnRole::User, content)
    }

    /// An assistant-role turn with no tool calls attached.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(TurnRole::Assistant, content)
    }

    /// An assistant turn echoing the tool calls it initiated.
    pub fn assistant_with_calls(content: impl Into<String>, calls: Vec<ToolCallRequest>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
            tool_call_id: None,
            tool_calls: calls,
        }
    }

    /// A tool-result turn keyed by the originating call id.
    pub fn tool(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Tool,
            content: content.into(),
            tool_call_id: Some(call_id.into()),
            tool_calls: Vec::new(),
        }
    }

    fn plain(role: TurnRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_call_id: None,
            tool_calls: Vec::new(),
        }
    }
}
