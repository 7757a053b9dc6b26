use thiserror::Error;

/// Errors surfaced by the conversation pipeline.
///
/// Provider failures are absorbed by the fallback cascade; by the time an
/// error escapes the pipeline it is one of these.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Every fallback tier was exhausted. The only pipeline condition that
    /// becomes a user-visible error.
    #[error("no completion tier available")]
    CompletionUnavailable,

    /// The inbound transcript was empty or its last turn had no content.
    #[error("message content cannot be empty")]
    EmptyMessage,
}
