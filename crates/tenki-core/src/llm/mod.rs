//! Completion service abstractions.
//!
//! - `CompletionBackend`: RPITIT trait for concrete provider implementations
//! - `BoxCompletionBackend`: object-safe wrapper for dynamic dispatch
//! - `ModelCascade`: the three-tier fallback policy

pub mod box_provider;
pub mod cascade;
pub mod provider;
