//! Request-scoped chat service and response emitter.
//!
//! One inbound request drives the chain sequentially: transcript assembly,
//! first-pass completion through the cascade, tool-call resolution (with an
//! optional weather fetch), then the answer pass -- emitted either as one
//! buffered reply or as an incremental frame stream. Nothing survives the
//! request; transcript copies are extended, never mutated in place.

use std::pin::Pin;
use std::sync::Arc;

use chrono::Local;
use futures_util::{Stream, StreamExt};

use tenki_types::chat::ConversationTurn;
use tenki_types::error::ChatError;
use tenki_types::llm::{Completion, StreamEvent};
use tenki_types::weather::{Locale, WeatherSnapshot};

use crate::llm::cascade::ModelCascade;
use crate::weather::aggregate::ForecastAggregator;
use crate::weather::provider::WeatherBackend;

use super::hallucination::{clean, looks_hallucinated, strip};
use super::prompt::{build_transcript, fetched_weather_turn};
use super::resolve::{classify, parse_tool_arguments, CallResolution, Resolved};

/// Total completions allowed while re-querying for a structured call.
const MAX_TOOL_RETRIES: u32 = 3;

/// One inbound conversation request.
#[derive(Debug, Clone)]
pub struct ChatPrompt {
    pub history: Vec<ConversationTurn>,
    /// Snapshot the caller already holds from an earlier turn, re-supplied
    /// per request (nothing is cached server-side).
    pub context_weather: Option<WeatherSnapshot>,
    pub locale: Locale,
}

/// Buffered reply.
#[derive(Debug)]
pub struct ChatReply {
    pub text: String,
    pub weather: Option<WeatherSnapshot>,
    /// Which model answered the first pass; later turns in the same request
    /// stay pinned to it.
    pub model_id: String,
}

/// One frame of the incremental response channel.
#[derive(Debug)]
pub enum StreamFrame {
    /// The weather side-payload; at most one, always before any text.
    Weather(WeatherSnapshot),
    /// One cleaned fragment of generated text.
    Text(String),
    /// Terminal frame; the channel closes after it.
    Done,
}

/// Orchestrates the conversation pipeline for one request at a time.
pub struct ChatService<W: WeatherBackend> {
    cascade: ModelCascade,
    weather: ForecastAggregator<W>,
}

impl<W: WeatherBackend> ChatService<W> {
    pub fn new(cascade: ModelCascade, weather: ForecastAggregator<W>) -> Self {
        Self { cascade, weather }
    }

    /// Direct access to the aggregator (used by the standalone weather
    /// endpoint, which shares the same contract with days=1).
    pub fn weather(&self) -> &ForecastAggregator<W> {
        &self.weather
    }

    /// Reject an empty history or a blank final turn.
    pub fn validate(history: &[ConversationTurn]) -> Result<(), ChatError> {
        match history.last() {
            Some(turn) if !turn.content.trim().is_empty() => Ok(()),
            _ => Err(ChatError::EmptyMessage),
        }
    }

    /// Buffered response path.
    pub async fn respond(&self, prompt: ChatPrompt) -> Result<ChatReply, ChatError> {
        Self::validate(&prompt.history)?;

        let transcript = build_transcript(
            &prompt.history,
            prompt.context_weather.as_ref(),
            prompt.locale,
            Local::now().date_naive(),
        );

        let outcome = self.cascade.complete(&transcript, true).await?;
        let model_id = outcome.model_id.clone();
        let resolved = self
            .resolve(&transcript, outcome.completion, &model_id, prompt.locale)
            .await;

        match resolved {
            Resolved::Answered { text, weather } => Ok(ChatReply {
                text: text_or_apology(text, prompt.locale),
                weather,
                model_id,
            }),
            Resolved::ToolExchange {
                transcript: extended,
                weather,
            } => {
                let answer = self.cascade.complete_answer(&extended).await?;
                Ok(ChatReply {
                    text: text_or_apology(clean(&answer.completion.text), prompt.locale),
                    weather,
                    model_id,
                })
            }
            Resolved::NoCall => {
                let answer = self.cascade.complete_answer(&transcript).await?;
                Ok(ChatReply {
                    text: text_or_apology(clean(&answer.completion.text), prompt.locale),
                    weather: None,
                    model_id,
                })
            }
        }
    }

    /// Incremental response path.
    ///
    /// Emits an optional weather frame, then zero or more cleaned text
    /// fragments, then exactly one `Done`. When every tier is exhausted
    /// during setup the stream terminates without a text frame. Fragment
    /// cleaning is applied per fragment; a markup tag split across two
    /// fragments is only partially stripped (accepted limitation, see
    /// DESIGN.md).
    pub fn respond_stream(
        self: Arc<Self>,
        prompt: ChatPrompt,
    ) -> Pin<Box<dyn Stream<Item = StreamFrame> + Send + 'static>>
    where
        W: 'static,
    {
        Box::pin(async_stream::stream! {
            if Self::validate(&prompt.history).is_err() {
                yield StreamFrame::Done;
                return;
            }

            let transcript = build_transcript(
                &prompt.history,
                prompt.context_weather.as_ref(),
                prompt.locale,
                Local::now().date_naive(),
            );

            let outcome = match self.cascade.complete(&transcript, true).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    tracing::error!(error = %err, "First pass failed, terminating stream");
                    yield StreamFrame::Done;
                    return;
                }
            };
            let model_id = outcome.model_id.clone();
            let resolved = self
                .resolve(&transcript, outcome.completion, &model_id, prompt.locale)
                .await;

            let (answer_turns, weather) = match resolved {
                Resolved::Answered { text, weather } => {
                    if let Some(snapshot) = weather {
                        yield StreamFrame::Weather(snapshot);
                    }
                    if !text.is_empty() {
                        yield StreamFrame::Text(text);
                    }
                    yield StreamFrame::Done;
                    return;
                }
                Resolved::ToolExchange { transcript: extended, weather } => (extended, weather),
                Resolved::NoCall => (transcript, None),
            };

            if let Some(snapshot) = weather {
                yield StreamFrame::Weather(snapshot);
            }

            let mut events = self.cascade.stream_answer(answer_turns);
            while let Some(event) = events.next().await {
                match event {
                    Ok(StreamEvent::TextDelta { text }) => {
                        let fragment = strip(&text);
                        if !fragment.is_empty() {
                            yield StreamFrame::Text(fragment);
                        }
                    }
                    Ok(_) => {}
                    Err(err) => {
                        tracing::error!(error = %err, "Answer stream failed");
                        break;
                    }
                }
            }
            yield StreamFrame::Done;
        })
    }

    /// The tool-call resolution state machine.
    ///
    /// Structured calls are strictly preferred over text-parsed ones, so a
    /// completion whose text merely looks like a call is re-queried (pinned
    /// to the answering model, tools forced on) up to [`MAX_TOOL_RETRIES`]
    /// total attempts before hallucination handling takes over.
    async fn resolve(
        &self,
        transcript: &[ConversationTurn],
        mut completion: Completion,
        model_id: &str,
        locale: Locale,
    ) -> Resolved {
        let mut attempts = 1;
        while completion.tool_calls.is_empty()
            && looks_hallucinated(&completion.text)
            && attempts < MAX_TOOL_RETRIES
        {
            tracing::warn!(
                attempt = attempts,
                limit = MAX_TOOL_RETRIES,
                "Tool call leaked into text, re-querying for a structured call"
            );
            match self
                .cascade
                .complete_pinned(transcript, model_id, true, self.cascade.answer_max_tokens())
                .await
            {
                Ok(retried) => completion = retried,
                Err(err) => {
                    tracing::warn!(error = %err, "Re-query failed, keeping leaked completion");
                    break;
                }
            }
            attempts += 1;
        }

        match classify(&completion) {
            CallResolution::StructuredCallFound(call) => {
                let Some(query) = parse_tool_arguments(&call.arguments) else {
                    return Resolved::NoCall;
                };
                tracing::info!(city = %query.city, days = query.days, "Executing structured tool call");
                let weather = self.weather.fetch(&query.city, locale, query.days).await;
                let payload =
                    serde_json::to_string(&weather).unwrap_or_else(|_| "null".to_string());

                let mut extended = transcript.to_vec();
                extended.push(ConversationTurn::assistant_with_calls(
                    completion.text.clone(),
                    completion.tool_calls.clone(),
                ));
                extended.push(ConversationTurn::tool(call.id, payload));

                Resolved::ToolExchange {
                    transcript: extended,
                    weather,
                }
            }
            CallResolution::HallucinatedCallFound(call) => {
                let Some(query) = parse_tool_arguments(&call.arguments) else {
                    return Resolved::NoCall;
                };
                tracing::info!(city = %query.city, "Executing tool call recovered from text");
                let weather = self.weather.fetch(&query.city, locale, query.days).await;
                let payload =
                    serde_json::to_string(&weather).unwrap_or_else(|_| "null".to_string());

                // The dirty turn must not reach the model verbatim either.
                let mut extended = transcript.to_vec();
                extended.push(ConversationTurn::assistant(strip(&completion.text)));
                extended.push(fetched_weather_turn(&query.city, &payload));

                match self
                    .cascade
                    .complete_pinned(&extended, model_id, false, self.cascade.followup_max_tokens())
                    .await
                {
                    Ok(followup) if !clean(&followup.text).is_empty() => Resolved::Answered {
                        text: clean(&followup.text),
                        weather,
                    },
                    Ok(_) => Resolved::Answered {
                        text: clean(&completion.text),
                        weather,
                    },
                    Err(err) => {
                        tracing::warn!(error = %err, "Follow-up failed, returning stripped original");
                        Resolved::Answered {
                            text: clean(&completion.text),
                            weather,
                        }
                    }
                }
            }
            CallResolution::NoCallFound => Resolved::NoCall,
        }
    }
}

fn text_or_apology(text: String, locale: Locale) -> String {
    if text.is_empty() {
        locale.apology().to_string()
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use chrono::NaiveDate;

    use tenki_types::config::{ModelTiers, RequestSettings};
    use tenki_types::llm::{
        CompletionError, CompletionRequest, StopReason, ToolCallRequest,
    };
    use tenki_types::weather::{CurrentConditions, ForecastSample, GeoMatch, WeatherError};

    use crate::llm::box_provider::BoxCompletionBackend;
    use crate::llm::provider::CompletionBackend;

    // --- Mock completion backend ---

    struct ScriptedBackend {
        completions: Mutex<VecDeque<Result<Completion, CompletionError>>>,
        streams: Mutex<VecDeque<Vec<Result<StreamEvent, CompletionError>>>>,
        calls: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedBackend {
        fn new(script: Vec<Result<Completion, CompletionError>>) -> Self {
            Self {
                completions: Mutex::new(script.into_iter().collect()),
                streams: Mutex::new(VecDeque::new()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn push_stream(&self, events: Vec<Result<StreamEvent, CompletionError>>) {
            self.streams.lock().unwrap().push_back(events);
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl CompletionBackend for &'static ScriptedBackend {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(
            &self,
            request: &CompletionRequest,
        ) -> Result<Completion, CompletionError> {
            self.calls.lock().unwrap().push(request.clone());
            self.completions
                .lock()
                .unwrap()
                .pop_front()
                .expect("mock completion script exhausted")
        }

        fn stream(
            &self,
            request: CompletionRequest,
        ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, CompletionError>> + Send + 'static>>
        {
            self.calls.lock().unwrap().push(request);
            let events = self
                .streams
                .lock()
                .unwrap()
                .pop_front()
                .expect("mock stream script exhausted");
            Box::pin(futures_util::stream::iter(events))
        }
    }

    // --- Mock weather backend ---

    struct MockWeather {
        geocode_calls: Mutex<Vec<String>>,
    }

    impl MockWeather {
        fn new() -> Self {
            Self {
                geocode_calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl WeatherBackend for &'static MockWeather {
        async fn geocode(&self, query: &str) -> Result<Option<GeoMatch>, WeatherError> {
            self.geocode_calls.lock().unwrap().push(query.to_string());
            Ok(Some(GeoMatch {
                lat: 35.0116,
                lon: 135.7681,
                name: "Kyoto".to_string(),
                country: "JP".to_string(),
            }))
        }

        async fn current(
            &self,
            _place: &GeoMatch,
            _locale: Locale,
        ) -> Result<CurrentConditions, WeatherError> {
            Ok(CurrentConditions {
                temp: 22.3,
                feels_like: 21.8,
                humidity: 61,
                description: "晴天".to_string(),
                icon: "01d".to_string(),
                wind_speed: 2.4,
            })
        }

        async fn forecast(
            &self,
            _place: &GeoMatch,
            _locale: Locale,
        ) -> Result<Vec<ForecastSample>, WeatherError> {
            let base = "2019-01-01".parse::<NaiveDate>().unwrap();
            Ok((0..8)
                .map(|i| ForecastSample {
                    at: base.and_hms_opt(3 * i, 0, 0).unwrap(),
                    temp: 20.0,
                    description: "曇り".to_string(),
                    icon: "03d".to_string(),
                })
                .collect())
        }
    }

    // --- Helpers ---

    fn completion(text: &str, calls: Vec<ToolCallRequest>) -> Completion {
        Completion {
            id: "cmpl-1".to_string(),
            model: "primary-model".to_string(),
            text: text.to_string(),
            tool_calls: calls,
            stop_reason: if text.is_empty() {
                StopReason::ToolUse
            } else {
                StopReason::EndTurn
            },
        }
    }

    fn weather_call(id: &str, args: &str) -> ToolCallRequest {
        ToolCallRequest {
            id: id.to_string(),
            name: "get_weather".to_string(),
            arguments: args.to_string(),
        }
    }

    fn service(
        backend: &'static ScriptedBackend,
        weather: &'static MockWeather,
    ) -> Arc<ChatService<&'static MockWeather>> {
        let cascade = ModelCascade::new(
            BoxCompletionBackend::new(backend),
            ModelTiers {
                primary: "primary-model".to_string(),
                secondary: "secondary-model".to_string(),
                tertiary: "tertiary-model".to_string(),
            },
            RequestSettings::default(),
        );
        Arc::new(ChatService::new(cascade, ForecastAggregator::new(weather)))
    }

    fn leak<T>(value: T) -> &'static T {
        Box::leak(Box::new(value))
    }

    fn kyoto_prompt() -> ChatPrompt {
        ChatPrompt {
            history: vec![ConversationTurn::user("京都の天気は？")],
            context_weather: None,
            locale: Locale::Ja,
        }
    }

    const HALLUCINATED: &str =
        r#"お調べします。<function=get_weather>{"city": "Kyoto, Japan", "days": "1"}</function>"#;

    // --- Tests ---

    #[tokio::test]
    async fn test_end_to_end_structured_tool_call() {
        let backend = leak(ScriptedBackend::new(vec![
            Ok(completion(
                "",
                vec![weather_call("call_1", r#"{"city": "Kyoto, Japan", "days": "1"}"#)],
            )),
            Ok(completion("傘は不要です。- 散策\n- 寺院巡り", Vec::new())),
        ]));
        let weather = leak(MockWeather::new());

        let reply = service(backend, weather)
            .respond(kyoto_prompt())
            .await
            .unwrap();

        assert!(!reply.text.is_empty());
        assert!(!reply.text.contains("<function="));
        assert_eq!(reply.model_id, "primary-model");
        let snapshot = reply.weather.expect("weather payload attached");
        assert_eq!(snapshot.city, "Kyoto");
        assert_eq!(snapshot.forecast.len(), 1);

        // The answer pass saw the tool exchange: assistant turn echoing the
        // call, then the tool result keyed by the call id.
        let calls = backend.calls.lock().unwrap();
        let second_pass = &calls[1];
        let roles: Vec<String> = second_pass.turns.iter().map(|t| t.role.to_string()).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "tool"]);
        assert_eq!(
            second_pass.turns[3].tool_call_id.as_deref(),
            Some("call_1")
        );
        assert!(second_pass.tools.is_none());
    }

    #[tokio::test]
    async fn test_multiple_calls_trigger_exactly_one_fetch() {
        let backend = leak(ScriptedBackend::new(vec![
            Ok(completion(
                "",
                vec![
                    weather_call("call_1", r#"{"city": "Kyoto, Japan"}"#),
                    weather_call("call_2", r#"{"city": "Osaka, Japan"}"#),
                ],
            )),
            Ok(completion("advice", Vec::new())),
        ]));
        let weather = leak(MockWeather::new());

        let reply = service(backend, weather)
            .respond(kyoto_prompt())
            .await
            .unwrap();

        assert!(reply.weather.is_some());
        // One geocode sequence means one fetch; both queries contain a
        // comma so normalization never adds a retry.
        assert_eq!(
            *weather.geocode_calls.lock().unwrap(),
            vec!["Kyoto, Japan".to_string()]
        );
    }

    #[tokio::test]
    async fn test_hallucinated_call_requeried_then_recovered() {
        let backend = leak(ScriptedBackend::new(vec![
            // Initial pass and both re-queries keep leaking markup.
            Ok(completion(HALLUCINATED, Vec::new())),
            Ok(completion(HALLUCINATED, Vec::new())),
            Ok(completion(HALLUCINATED, Vec::new())),
            // Bounded follow-up after the fetch.
            Ok(completion("京都は晴れです。- 嵐山散策", Vec::new())),
        ]));
        let weather = leak(MockWeather::new());

        let reply = service(backend, weather)
            .respond(kyoto_prompt())
            .await
            .unwrap();

        assert_eq!(reply.text, "京都は晴れです。- 嵐山散策");
        assert!(reply.weather.is_some());
        assert_eq!(backend.call_count(), 4);

        // Re-queries force tools on; the follow-up runs without them and
        // with the smaller budget.
        let calls = backend.calls.lock().unwrap();
        assert!(calls[1].tools.is_some());
        assert!(calls[2].tools.is_some());
        assert!(calls[3].tools.is_none());
        assert_eq!(calls[3].max_tokens, 1000);
        // The follow-up transcript carries the stripped assistant turn.
        let assistant = &calls[3].turns[calls[3].turns.len() - 2];
        assert!(!assistant.content.contains("<function="));
    }

    #[tokio::test]
    async fn test_hallucinated_followup_failure_degrades_to_stripped_text() {
        let backend = leak(ScriptedBackend::new(vec![
            Ok(completion(HALLUCINATED, Vec::new())),
            Ok(completion(HALLUCINATED, Vec::new())),
            Ok(completion(HALLUCINATED, Vec::new())),
            Err(CompletionError::Provider {
                message: "boom".to_string(),
            }),
        ]));
        let weather = leak(MockWeather::new());

        let reply = service(backend, weather)
            .respond(kyoto_prompt())
            .await
            .unwrap();

        assert_eq!(reply.text, "お調べします。");
        assert!(reply.weather.is_some());
    }

    #[tokio::test]
    async fn test_requery_stops_once_structured_call_arrives() {
        let backend = leak(ScriptedBackend::new(vec![
            Ok(completion(HALLUCINATED, Vec::new())),
            Ok(completion(
                "",
                vec![weather_call("call_9", r#"{"city": "Kyoto, Japan"}"#)],
            )),
            Ok(completion("advice", Vec::new())),
        ]));
        let weather = leak(MockWeather::new());

        let reply = service(backend, weather)
            .respond(kyoto_prompt())
            .await
            .unwrap();

        assert_eq!(reply.text, "advice");
        assert_eq!(backend.call_count(), 3);
    }

    #[tokio::test]
    async fn test_no_call_answers_without_weather() {
        let backend = leak(ScriptedBackend::new(vec![
            Ok(completion("どちらの都市ですか？", Vec::new())),
            Ok(completion("どちらの都市ですか？", Vec::new())),
        ]));
        let weather = leak(MockWeather::new());

        let reply = service(backend, weather)
            .respond(ChatPrompt {
                history: vec![ConversationTurn::user("何を着ればいい？")],
                context_weather: None,
                locale: Locale::Ja,
            })
            .await
            .unwrap();

        assert!(reply.weather.is_none());
        assert!(weather.geocode_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_answer_becomes_localized_apology() {
        let backend = leak(ScriptedBackend::new(vec![
            Ok(completion("hello", Vec::new())),
            Ok(completion("", Vec::new())),
        ]));
        let weather = leak(MockWeather::new());

        let reply = service(backend, weather)
            .respond(ChatPrompt {
                history: vec![ConversationTurn::user("hi")],
                context_weather: None,
                locale: Locale::En,
            })
            .await
            .unwrap();

        assert_eq!(reply.text, "Sorry, I couldn't generate a response.");
    }

    #[tokio::test]
    async fn test_validate_rejects_blank_last_turn() {
        assert!(matches!(
            ChatService::<&'static MockWeather>::validate(&[ConversationTurn::user("  ")]),
            Err(ChatError::EmptyMessage)
        ));
        assert!(matches!(
            ChatService::<&'static MockWeather>::validate(&[]),
            Err(ChatError::EmptyMessage)
        ));
    }

    #[tokio::test]
    async fn test_stream_orders_weather_text_done() {
        let backend = leak(ScriptedBackend::new(vec![Ok(completion(
            "",
            vec![weather_call("call_1", r#"{"city": "Kyoto, Japan"}"#)],
        ))]));
        backend.push_stream(vec![
            Ok(StreamEvent::Connected),
            Ok(StreamEvent::TextDelta {
                text: "傘は".to_string(),
            }),
            Ok(StreamEvent::TextDelta {
                text: "不要です".to_string(),
            }),
            Ok(StreamEvent::Done),
        ]);
        let weather = leak(MockWeather::new());

        let frames: Vec<StreamFrame> = service(backend, weather)
            .respond_stream(kyoto_prompt())
            .collect()
            .await;

        assert!(matches!(frames[0], StreamFrame::Weather(_)));
        assert!(matches!(&frames[1], StreamFrame::Text(t) if t == "傘は"));
        assert!(matches!(&frames[2], StreamFrame::Text(t) if t == "不要です"));
        assert!(matches!(frames.last(), Some(StreamFrame::Done)));
        assert_eq!(frames.len(), 4);
    }

    #[tokio::test]
    async fn test_stream_cleans_fragments_independently() {
        let backend = leak(ScriptedBackend::new(vec![Ok(completion(
            "plain answer",
            Vec::new(),
        ))]));
        backend.push_stream(vec![
            Ok(StreamEvent::TextDelta {
                text: "advice <function=get_weather>x</function>".to_string(),
            }),
            Ok(StreamEvent::Done),
        ]);
        let weather = leak(MockWeather::new());

        let frames: Vec<StreamFrame> = service(backend, weather)
            .respond_stream(kyoto_prompt())
            .collect()
            .await;

        assert!(matches!(&frames[0], StreamFrame::Text(t) if t == "advice "));
        assert!(matches!(frames.last(), Some(StreamFrame::Done)));
    }

    #[tokio::test]
    async fn test_stream_exhausted_tiers_terminates_without_text() {
        let down = || {
            Err(CompletionError::Provider {
                message: "down".to_string(),
            })
        };
        let backend = leak(ScriptedBackend::new(vec![down(), down()]));
        let weather = leak(MockWeather::new());

        let frames: Vec<StreamFrame> = service(backend, weather)
            .respond_stream(kyoto_prompt())
            .collect()
            .await;

        assert_eq!(frames.len(), 1);
        assert!(matches!(frames[0], StreamFrame::Done));
    }
}
