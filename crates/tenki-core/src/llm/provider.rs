//! CompletionBackend trait definition.
//!
//! The one seam between the conversation pipeline and the hosted completion
//! service. Uses RPITIT for `complete` and `Pin<Box<dyn Stream>>` for
//! `stream` (streams need to be object-safe for the BoxCompletionBackend
//! wrapper).

use std::pin::Pin;

use futures_util::Stream;

use tenki_types::llm::{Completion, CompletionError, CompletionRequest, StreamEvent};

/// Trait for completion service backends.
///
/// Implementations live in tenki-infra (e.g. `GroqProvider`). The cascade
/// never cares which model a backend serves; the model id travels in the
/// request.
pub trait CompletionBackend: Send + Sync {
    /// Human-readable backend name (e.g. "groq").
    fn name(&self) -> &str;

    /// Send a completion request and receive the full response.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<Completion, CompletionError>> + Send;

    /// Send a streaming completion request. Returns a stream of events.
    ///
    /// Returns a boxed stream (not RPITIT) because streams need to be
    /// object-safe for the `BoxCompletionBackend` wrapper.
    fn stream(
        &self,
        request: CompletionRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, CompletionError>> + Send + 'static>>;
}
