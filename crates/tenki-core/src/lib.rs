//! Conversation pipeline and forecast aggregation for Tenki.
//!
//! This crate defines the "ports" (provider traits) that the infrastructure
//! layer implements, and the pure orchestration logic built on top of them:
//! the model fallback cascade, the tool-call resolution pipeline, the
//! hallucinated-call parser, and the forecast aggregator. It depends only on
//! `tenki-types` -- never on `tenki-infra` or any network crate.

pub mod chat;
pub mod llm;
pub mod weather;
