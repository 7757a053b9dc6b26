//! HTTP API layer for Tenki.
//!
//! Axum-based API with CORS and request tracing: `/chat` (buffered JSON
//! and SSE), `/weather`, `/transcribe`, `/health`.

pub mod error;
pub mod handlers;
pub mod router;
