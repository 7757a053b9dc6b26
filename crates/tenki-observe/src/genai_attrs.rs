//! OpenTelemetry GenAI Semantic Convention attribute constants.
//!
//! These follow the OTel GenAI Semantic Conventions specification for
//! consistent model-call instrumentation. All constants are string slices
//! usable in `tracing::span!` and `tracing::info_span!` field names.
//!
//! Span naming convention: `"{operation} {model}"` (e.g., `"chat llama-3.3-70b-versatile"`)

// --- Required attributes ---

/// The name of the operation being performed (e.g., "chat").
pub const GEN_AI_OPERATION_NAME: &str = "gen_ai.operation.name";

/// The name of the GenAI provider (e.g., "groq").
pub const GEN_AI_PROVIDER_NAME: &str = "gen_ai.provider.name";

// --- Recommended attributes ---

/// The model ID requested (e.g., "llama-3.3-70b-versatile").
pub const GEN_AI_REQUEST_MODEL: &str = "gen_ai.request.model";

/// The model ID that produced the response (may differ after fallback).
pub const GEN_AI_RESPONSE_MODEL: &str = "gen_ai.response.model";

/// The unique response/message ID from the provider.
pub const GEN_AI_RESPONSE_ID: &str = "gen_ai.response.id";

// --- Operation name values ---

/// Standard chat completion operation.
pub const OP_CHAT: &str = "chat";

/// Speech-to-text transcription operation.
pub const OP_TRANSCRIBE: &str = "transcribe";

// --- Provider name values ---

/// Groq provider identifier.
pub const PROVIDER_GROQ: &str = "groq";
