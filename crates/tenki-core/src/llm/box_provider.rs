//! BoxCompletionBackend -- object-safe dynamic dispatch wrapper.
//!
//! 1. Define an object-safe `CompletionBackendDyn` trait with boxed futures
//! 2. Blanket-impl `CompletionBackendDyn` for all `T: CompletionBackend`
//! 3. `BoxCompletionBackend` wraps `Box<dyn CompletionBackendDyn>` and delegates

use std::future::Future;
use std::pin::Pin;

use futures_util::Stream;

use tenki_types::llm::{Completion, CompletionError, CompletionRequest, StreamEvent};

use super::provider::CompletionBackend;

/// Object-safe version of [`CompletionBackend`] with boxed futures.
///
/// Exists solely to enable dynamic dispatch; a blanket implementation is
/// provided for all types implementing `CompletionBackend`.
pub trait CompletionBackendDyn: Send + Sync {
    fn name(&self) -> &str;

    fn complete_boxed<'a>(
        &'a self,
        request: &'a CompletionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Completion, CompletionError>> + Send + 'a>>;

    fn stream_boxed(
        &self,
        request: CompletionRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, CompletionError>> + Send + 'static>>;
}

impl<T: CompletionBackend> CompletionBackendDyn for T {
    fn name(&self) -> &str {
        CompletionBackend::name(self)
    }

    fn complete_boxed<'a>(
        &'a self,
        request: &'a CompletionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Completion, CompletionError>> + Send + 'a>> {
        Box::pin(self.complete(request))
    }

    fn stream_boxed(
        &self,
        request: CompletionRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, CompletionError>> + Send + 'static>> {
        self.stream(request)
    }
}

/// Type-erased completion backend.
///
/// Since `CompletionBackend` uses RPITIT it cannot be a trait object
/// directly; this wrapper provides equivalent methods that delegate to the
/// inner `CompletionBackendDyn` object.
pub struct BoxCompletionBackend {
    inner: Box<dyn CompletionBackendDyn + Send + Sync>,
}

impl BoxCompletionBackend {
    /// Wrap a concrete `CompletionBackend` in a type-erased box.
    pub fn new<T: CompletionBackend + 'static>(backend: T) -> Self {
        Self {
            inner: Box::new(backend),
        }
    }

    /// Human-readable backend name.
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Send a completion request and receive the full response.
    pub async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<Completion, CompletionError> {
        self.inner.complete_boxed(request).await
    }

    /// Send a streaming completion request. Returns a stream of events.
    pub fn stream(
        &self,
        request: CompletionRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, CompletionError>> + Send + 'static>> {
        self.inner.stream_boxed(request)
    }
}
