//! HTTP request handlers.

pub mod chat;
pub mod transcribe;
pub mod weather;
