//! Conversation orchestration.
//!
//! - `tool_schema`: the one capability offered to the model
//! - `hallucination`: detection/stripping of leaked pseudo-tool-call markup
//! - `prompt`: system prompts and transcript construction
//! - `resolve`: tool-call resolution pipeline
//! - `service`: the request-scoped chat service and response emitter

pub mod hallucination;
pub mod prompt;
pub mod resolve;
pub mod service;
pub mod tool_schema;
