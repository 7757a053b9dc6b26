//! Observability setup for Tenki.
//!
//! Tracing subscriber initialization and the OTel GenAI semantic
//! convention attribute names used on model-call spans.

pub mod genai_attrs;
pub mod tracing_setup;
