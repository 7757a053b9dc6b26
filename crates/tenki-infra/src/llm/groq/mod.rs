//! Groq completion provider.
//!
//! Speaks the OpenAI chat completions protocol against Groq's hosted
//! endpoint via [`async_openai`], including the `get_weather` tool schema
//! and SSE streaming. One provider instance serves every model tier; the
//! cascade selects the model per request.

pub mod config;
pub mod streaming;
pub mod transcribe;

use std::pin::Pin;

use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionMessageToolCall, ChatCompletionMessageToolCalls,
    ChatCompletionRequestAssistantMessage, ChatCompletionRequestAssistantMessageContent,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestSystemMessageContent, ChatCompletionRequestToolMessage,
    ChatCompletionRequestToolMessageContent, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, ChatCompletionStreamOptions, ChatCompletionTool,
    ChatCompletionToolChoiceOption, ChatCompletionTools, CreateChatCompletionRequest,
    FinishReason, FunctionCall, FunctionObject, ToolChoiceOptions,
};
use async_openai::Client;
use futures_util::Stream;

use tenki_core::llm::provider::CompletionBackend;
use tenki_types::chat::TurnRole;
use tenki_types::llm::{
    Completion, CompletionError, CompletionRequest, StopReason, StreamEvent, ToolCallRequest,
};

use self::config::GroqConfig;
use self::streaming::map_chat_stream;

/// Completion backend for Groq's OpenAI-compatible API.
///
/// # API Key Security
///
/// Does NOT derive Debug to prevent accidental exposure of the API key
/// stored inside the `async_openai::Client`.
pub struct GroqProvider {
    client: Client<OpenAIConfig>,
}

impl GroqProvider {
    /// Create a new provider from a configuration.
    pub fn new(config: GroqConfig) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.api_key)
            .with_api_base(&config.base_url);

        Self {
            client: Client::with_config(openai_config),
        }
    }

    /// Build a [`CreateChatCompletionRequest`] from a generic [`CompletionRequest`].
    fn build_request(
        &self,
        request: &CompletionRequest,
        stream: bool,
    ) -> CreateChatCompletionRequest {
        let mut messages: Vec<ChatCompletionRequestMessage> = Vec::new();

        for turn in &request.turns {
            let message = match turn.role {
                TurnRole::System => {
                    ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                        content: ChatCompletionRequestSystemMessageContent::Text(
                            turn.content.clone(),
                        ),
                        name: None,
                    })
                }
                TurnRole::User => {
                    ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                        content: ChatCompletionRequestUserMessageContent::Text(
                            turn.content.clone(),
                        ),
                        name: None,
                    })
                }
                TurnRole::Assistant => {
                    let tool_calls = (!turn.tool_calls.is_empty()).then(|| {
                        turn.tool_calls
                            .iter()
                            .map(|call| {
                                ChatCompletionMessageToolCalls::Function(
                                    ChatCompletionMessageToolCall {
                                        id: call.id.clone(),
                                        function: FunctionCall {
                                            name: call.name.clone(),
                                            arguments: call.arguments.clone(),
                                        },
                                    },
                                )
                            })
                            .collect()
                    });
                    #[allow(deprecated)]
                    ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                        content: Some(ChatCompletionRequestAssistantMessageContent::Text(
                            turn.content.clone(),
                        )),
                        refusal: None,
                        name: None,
                        audio: None,
                        tool_calls,
                        function_call: None,
                    })
                }
                TurnRole::Tool => {
                    ChatCompletionRequestMessage::Tool(ChatCompletionRequestToolMessage {
                        content: ChatCompletionRequestToolMessageContent::Text(
                            turn.content.clone(),
                        ),
                        tool_call_id: turn.tool_call_id.clone().unwrap_or_default(),
                    })
                }
            };
            messages.push(message);
        }

        let mut req = CreateChatCompletionRequest {
            model: request.model.clone(),
            messages,
            max_completion_tokens: Some(request.max_tokens),
            temperature: request.temperature.map(|t| t as f32),
            ..Default::default()
        };

        // Tool schema, when tool use is allowed this round
        if let Some(ref tools) = request.tools {
            req.tools = Some(
                tools
                    .iter()
                    .map(|tool| {
                        ChatCompletionTools::Function(ChatCompletionTool {
                            function: FunctionObject {
                                name: tool.name.clone(),
                                description: Some(tool.description.clone()),
                                parameters: Some(tool.parameters.clone()),
                                strict: None,
                            },
                        })
                    })
                    .collect(),
            );
            req.tool_choice = Some(ChatCompletionToolChoiceOption::Mode(ToolChoiceOptions::Auto));
        }

        // Streaming configuration
        if stream {
            req.stream = Some(true);
            req.stream_options = Some(ChatCompletionStreamOptions {
                include_usage: Some(false),
                include_obfuscation: None,
            });
        }

        req
    }
}

impl CompletionBackend for GroqProvider {
    fn name(&self) -> &str {
        "groq"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, CompletionError> {
        let chat_request = self.build_request(request, false);

        let response = self
            .client
            .chat()
            .create(chat_request)
            .await
            .map_err(map_openai_error)?;

        let choice = response.choices.first();

        let text = choice
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        let tool_calls = choice
            .and_then(|c| c.message.tool_calls.clone())
            .unwrap_or_default()
            .into_iter()
            .map(|tc| match tc {
                ChatCompletionMessageToolCalls::Function(f) => ToolCallRequest {
                    id: f.id,
                    name: f.function.name,
                    arguments: f.function.arguments,
                },
                ChatCompletionMessageToolCalls::Custom(c) => ToolCallRequest {
                    id: c.id,
                    name: c.custom_tool.name,
                    arguments: c.custom_tool.input,
                },
            })
            .collect();

        let stop_reason = choice
            .and_then(|c| c.finish_reason.as_ref())
            .map(map_finish_reason)
            .unwrap_or(StopReason::EndTurn);

        Ok(Completion {
            id: response.id,
            model: response.model,
            text,
            tool_calls,
            stop_reason,
        })
    }

    fn stream(
        &self,
        request: CompletionRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, CompletionError>> + Send + 'static>> {
        let chat_request = self.build_request(&request, true);

        // Clone the client for the 'static stream closure
        let client = self.client.clone();

        Box::pin(async_stream::try_stream! {
            let chat_stream = client
                .chat()
                .create_stream(chat_request)
                .await
                .map_err(map_openai_error)?;

            let mut inner = map_chat_stream(chat_stream);

            use futures_util::StreamExt;
            while let Some(event) = inner.next().await {
                match event {
                    Ok(ev) => yield ev,
                    Err(e) => Err(e)?,
                }
            }
        })
    }
}

/// Map an OpenAI-protocol finish reason to a [`StopReason`].
pub(crate) fn map_finish_reason(finish: &FinishReason) -> StopReason {
    match finish {
        FinishReason::Stop => StopReason::EndTurn,
        FinishReason::Length => StopReason::MaxTokens,
        FinishReason::ToolCalls => StopReason::ToolUse,
        FinishReason::ContentFilter => StopReason::EndTurn,
        FinishReason::FunctionCall => StopReason::ToolUse,
    }
}

/// Map an `async_openai::error::OpenAIError` to a [`CompletionError`].
///
/// 429 and overload signals classify as `CapacityExceeded` (tier
/// fallback), 400-shaped rejections as `SchemaRejected` (bounded retry,
/// then tools off), 404 as `ModelUnavailable`.
fn map_openai_error(err: async_openai::error::OpenAIError) -> CompletionError {
    use async_openai::error::OpenAIError;

    match &err {
        OpenAIError::ApiError(api_err) => {
            let code = api_err.code.as_deref().unwrap_or("");
            let error_type = api_err.r#type.as_deref().unwrap_or("");

            if code == "rate_limit_exceeded"
                || error_type == "rate_limit_error"
                || error_type == "overloaded_error"
            {
                CompletionError::CapacityExceeded {
                    retry_after_ms: None,
                }
            } else if code == "model_not_found" || api_err.message.contains("does not exist") {
                CompletionError::ModelUnavailable(api_err.message.clone())
            } else if code == "authentication_error"
                || error_type == "authentication_error"
                || api_err.message.contains("Invalid API Key")
            {
                CompletionError::AuthenticationFailed
            } else if error_type == "invalid_request_error" {
                CompletionError::SchemaRejected(api_err.message.clone())
            } else {
                CompletionError::Provider {
                    message: err.to_string(),
                }
            }
        }
        OpenAIError::Reqwest(reqwest_err) => {
            if let Some(status) = reqwest_err.status() {
                match status.as_u16() {
                    400 => CompletionError::SchemaRejected(err.to_string()),
                    401 => CompletionError::AuthenticationFailed,
                    404 => CompletionError::ModelUnavailable(err.to_string()),
                    429 => CompletionError::CapacityExceeded {
                        retry_after_ms: None,
                    },
                    _ => CompletionError::Provider {
                        message: err.to_string(),
                    },
                }
            } else {
                CompletionError::Provider {
                    message: err.to_string(),
                }
            }
        }
        OpenAIError::JSONDeserialize(_, content) => {
            CompletionError::Deserialization(format!("failed to parse response: {content}"))
        }
        OpenAIError::StreamError(stream_err) => CompletionError::Stream(stream_err.to_string()),
        OpenAIError::InvalidArgument(msg) => CompletionError::SchemaRejected(msg.clone()),
        _ => CompletionError::Provider {
            message: err.to_string(),
        },
    }
}
