//! Three-tier model fallback cascade.
//!
//! Drives completion requests against a ranked list of models with
//! differing availability and capability. Capacity-exceeded rejections walk
//! down the tiers; schema rejections are retried on the same model (they
//! are frequently transient encoding issues) before tools are dropped for
//! that model; anything else falls to one last-resort attempt on the
//! tertiary tier with tools disabled.

use std::pin::Pin;

use futures_util::{Stream, StreamExt};

use tenki_types::chat::ConversationTurn;
use tenki_types::config::{ModelTiers, RequestSettings};
use tenki_types::error::ChatError;
use tenki_types::llm::{Completion, CompletionError, CompletionRequest, StreamEvent};

use crate::chat::tool_schema::weather_tool;

use super::box_provider::BoxCompletionBackend;

/// Attempts per model on a schema rejection before tools are dropped.
const SCHEMA_RETRY_LIMIT: u32 = 3;

/// A completion together with the model that ultimately produced it.
///
/// Later rounds in the same request stay pinned to `model_id`, since it is
/// the one model known to be answering right now.
#[derive(Debug)]
pub struct CascadeOutcome {
    pub completion: Completion,
    pub model_id: String,
}

/// Routes completion requests through the primary/secondary/tertiary tiers.
///
/// Purely functional given the transcript; the only side effects are the
/// outbound provider calls.
pub struct ModelCascade {
    backend: BoxCompletionBackend,
    tiers: ModelTiers,
    request: RequestSettings,
}

impl ModelCascade {
    pub fn new(backend: BoxCompletionBackend, tiers: ModelTiers, request: RequestSettings) -> Self {
        Self {
            backend,
            tiers,
            request,
        }
    }

    fn build_request(
        &self,
        model: &str,
        turns: &[ConversationTurn],
        with_tools: bool,
        max_tokens: u32,
        stream: bool,
    ) -> CompletionRequest {
        CompletionRequest {
            model: model.to_string(),
            turns: turns.to_vec(),
            tools: with_tools.then(|| vec![weather_tool()]),
            max_tokens,
            temperature: Some(self.request.temperature),
            stream,
        }
    }

    async fn issue(
        &self,
        model: &str,
        turns: &[ConversationTurn],
        with_tools: bool,
    ) -> Result<Completion, CompletionError> {
        let request = self.build_request(model, turns, with_tools, self.request.max_tokens, false);
        self.backend.complete(&request).await
    }

    /// Issue against one model, absorbing transient schema rejections.
    ///
    /// Retries up to [`SCHEMA_RETRY_LIMIT`] attempts total; the last
    /// rejection is returned so the caller can drop tools for this model.
    async fn issue_with_schema_retry(
        &self,
        model: &str,
        turns: &[ConversationTurn],
        with_tools: bool,
    ) -> Result<Completion, CompletionError> {
        let mut attempt = 1;
        loop {
            match self.issue(model, turns, with_tools).await {
                Err(CompletionError::SchemaRejected(reason)) if attempt < SCHEMA_RETRY_LIMIT => {
                    tracing::warn!(
                        model,
                        attempt,
                        limit = SCHEMA_RETRY_LIMIT,
                        %reason,
                        "Schema rejection, retrying same model"
                    );
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    /// Walk the tiers for a first-pass completion.
    async fn tiered_attempt(
        &self,
        turns: &[ConversationTurn],
        allow_tools: bool,
    ) -> Result<CascadeOutcome, CompletionError> {
        tracing::debug!(model = %self.tiers.primary, "Attempting primary tier");
        match self
            .issue_with_schema_retry(&self.tiers.primary, turns, allow_tools)
            .await
        {
            Ok(completion) => Ok(CascadeOutcome {
                completion,
                model_id: self.tiers.primary.clone(),
            }),
            Err(CompletionError::CapacityExceeded { .. }) => {
                tracing::warn!(
                    from = %self.tiers.primary,
                    to = %self.tiers.secondary,
                    "Primary tier capacity exceeded, falling back"
                );
                match self.issue(&self.tiers.secondary, turns, allow_tools).await {
                    Ok(completion) => Ok(CascadeOutcome {
                        completion,
                        model_id: self.tiers.secondary.clone(),
                    }),
                    Err(
                        CompletionError::CapacityExceeded { .. }
                        | CompletionError::ModelUnavailable(_),
                    ) => {
                        tracing::warn!(
                            to = %self.tiers.tertiary,
                            "Secondary tier failed, falling back to tertiary"
                        );
                        let completion =
                            self.issue(&self.tiers.tertiary, turns, allow_tools).await?;
                        Ok(CascadeOutcome {
                            completion,
                            model_id: self.tiers.tertiary.clone(),
                        })
                    }
                    Err(err) => Err(err),
                }
            }
            Err(CompletionError::SchemaRejected(reason)) => {
                // Persisted through all retries: give up on tools for this model.
                tracing::warn!(model = %self.tiers.primary, %reason, "Schema rejection persisted, reissuing without tools");
                let completion = self.issue(&self.tiers.primary, turns, false).await?;
                Ok(CascadeOutcome {
                    completion,
                    model_id: self.tiers.primary.clone(),
                })
            }
            Err(err) => Err(err),
        }
    }

    /// First-pass completion with full fallback policy.
    ///
    /// Any unclassified failure inside the tier walk triggers one
    /// last-resort attempt on the tertiary tier with tools disabled. Only
    /// when that also fails does the cascade report
    /// [`ChatError::CompletionUnavailable`].
    pub async fn complete(
        &self,
        turns: &[ConversationTurn],
        allow_tools: bool,
    ) -> Result<CascadeOutcome, ChatError> {
        match self.tiered_attempt(turns, allow_tools).await {
            Ok(outcome) => {
                tracing::debug!(model = %outcome.model_id, "Completion produced");
                Ok(outcome)
            }
            Err(err) => {
                tracing::error!(error = %err, "Tier walk failed, last-resort attempt without tools");
                match self.issue(&self.tiers.tertiary, turns, false).await {
                    Ok(completion) => Ok(CascadeOutcome {
                        completion,
                        model_id: self.tiers.tertiary.clone(),
                    }),
                    Err(final_err) => {
                        tracing::error!(error = %final_err, "Every completion tier exhausted");
                        Err(ChatError::CompletionUnavailable)
                    }
                }
            }
        }
    }

    /// One attempt against a known-good model, no fallback.
    ///
    /// Used for the bounded hallucination re-query (tools forced on) and
    /// the post-fetch follow-up (tools off, smaller budget).
    pub async fn complete_pinned(
        &self,
        turns: &[ConversationTurn],
        model_id: &str,
        with_tools: bool,
        max_tokens: u32,
    ) -> Result<Completion, CompletionError> {
        let request = self.build_request(model_id, turns, with_tools, max_tokens, false);
        self.backend.complete(&request).await
    }

    /// Token budget for first-pass and answer completions.
    pub fn answer_max_tokens(&self) -> u32 {
        self.request.max_tokens
    }

    /// Token budget for bounded follow-up completions.
    pub fn followup_max_tokens(&self) -> u32 {
        self.request.followup_max_tokens
    }

    /// Second-pass/buffered answer completion: primary tier without tools,
    /// one fallback to secondary on capacity-exceeded.
    pub async fn complete_answer(
        &self,
        turns: &[ConversationTurn],
    ) -> Result<CascadeOutcome, ChatError> {
        match self.issue(&self.tiers.primary, turns, false).await {
            Ok(completion) => Ok(CascadeOutcome {
                completion,
                model_id: self.tiers.primary.clone(),
            }),
            Err(CompletionError::CapacityExceeded { .. }) => {
                tracing::warn!(
                    to = %self.tiers.secondary,
                    "Answer pass capacity exceeded, falling back to secondary"
                );
                match self.issue(&self.tiers.secondary, turns, false).await {
                    Ok(completion) => Ok(CascadeOutcome {
                        completion,
                        model_id: self.tiers.secondary.clone(),
                    }),
                    Err(err) => {
                        tracing::error!(error = %err, "Secondary answer pass failed");
                        Err(ChatError::CompletionUnavailable)
                    }
                }
            }
            Err(err) => {
                tracing::error!(error = %err, "Answer pass failed");
                Err(ChatError::CompletionUnavailable)
            }
        }
    }

    /// Streaming answer completion.
    ///
    /// Opens the stream on the primary tier. A capacity-exceeded error
    /// arriving before any text fragment transparently reopens the stream
    /// on the secondary tier (once); after the first fragment has been
    /// delivered there is no recovery and the error is propagated.
    pub fn stream_answer<'a>(
        &'a self,
        turns: Vec<ConversationTurn>,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, CompletionError>> + Send + 'a>> {
        Box::pin(async_stream::stream! {
            let primary = self.build_request(
                &self.tiers.primary,
                &turns,
                false,
                self.request.max_tokens,
                true,
            );
            let mut inner = self.backend.stream(primary);
            let mut delivered_text = false;
            let mut switched = false;

            loop {
                match inner.next().await {
                    Some(Ok(event)) => {
                        if matches!(event, StreamEvent::TextDelta { .. }) {
                            delivered_text = true;
                        }
                        yield Ok(event);
                    }
                    Some(Err(CompletionError::CapacityExceeded { .. }))
                        if !delivered_text && !switched =>
                    {
                        tracing::warn!(
                            to = %self.tiers.secondary,
                            "Stream capacity exceeded before first fragment, reopening on secondary"
                        );
                        switched = true;
                        let secondary = self.build_request(
                            &self.tiers.secondary,
                            &turns,
                            false,
                            self.request.max_tokens,
                            true,
                        );
                        inner = self.backend.stream(secondary);
                    }
                    Some(Err(err)) => {
                        yield Err(err);
                        break;
                    }
                    None => break,
                }
            }
        })
    }
}
