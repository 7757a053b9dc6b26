//! Shared domain types for Tenki.
//!
//! This crate contains the data shapes used across the Tenki service:
//! conversation turns, completion requests/responses, weather snapshots,
//! configuration, and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, serde_json, chrono,
//! thiserror.

pub mod chat;
pub mod config;
pub mod error;
pub mod llm;
pub mod weather;
