//! Tool-call resolution.
//!
//! Pure helpers for deciding what a completion actually asked for. A
//! completion either carries structured tool calls, a hallucinated call
//! leaked into its text, or no call at all. Exactly one capability exists,
//! and at most one fetch is performed per request: simultaneous structured
//! calls beyond the first are discarded.

use tenki_types::chat::ConversationTurn;
use tenki_types::llm::{Completion, ToolCallRequest};
use tenki_types::weather::WeatherSnapshot;

use super::hallucination;
use super::tool_schema::WEATHER_TOOL;

/// What the completion asked for.
#[derive(Debug)]
pub enum CallResolution {
    /// The completion carries a structured `get_weather` call.
    StructuredCallFound(ToolCallRequest),
    /// No structured call, but one was recovered from the answer text.
    HallucinatedCallFound(ToolCallRequest),
    /// No call at all -- valid, e.g. when answering from known context.
    NoCallFound,
}

/// Outcome of the resolution pipeline, consumed by the response emitter.
#[derive(Debug)]
pub enum Resolved {
    /// A structured call was executed; the transcript now carries the
    /// assistant turn and the tool result, ready for the answer pass.
    ToolExchange {
        transcript: Vec<ConversationTurn>,
        weather: Option<WeatherSnapshot>,
    },
    /// The hallucinated-call path already produced the final text.
    Answered {
        text: String,
        weather: Option<WeatherSnapshot>,
    },
    /// Nothing to execute; the answer pass runs on the original transcript.
    NoCall,
}

/// Parsed arguments of a weather call.
#[derive(Debug, PartialEq, Eq)]
pub struct WeatherQuery {
    pub city: String,
    pub days: u32,
}

/// Classify a completion.
///
/// When structured calls are present only the first is considered; an
/// unknown tool name is ignored (never executed) and resolves as no call.
/// Hallucination recovery only runs when no structured call exists at all.
pub fn classify(completion: &Completion) -> CallResolution {
    if let Some(first) = completion.tool_calls.first() {
        if completion.tool_calls.len() > 1 {
            tracing::warn!(
                discarded = completion.tool_calls.len() - 1,
                "Multiple simultaneous tool calls; executing the first only"
            );
        }
        if first.name == WEATHER_TOOL {
            return CallResolution::StructuredCallFound(first.clone());
        }
        tracing::warn!(name = %first.name, "Unknown tool name in structured call, ignoring");
        return CallResolution::NoCallFound;
    }

    match hallucination::extract(&completion.text) {
        Some(call) => CallResolution::HallucinatedCallFound(call),
        None => CallResolution::NoCallFound,
    }
}

/// Parse a call's raw JSON arguments.
///
/// `city` is required; a missing or non-numeric `days` defaults to 1.
/// Malformed JSON yields `None` (logged, call discarded).
pub fn parse_tool_arguments(raw: &str) -> Option<WeatherQuery> {
    let value: serde_json::Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(error = %err, "Malformed tool call arguments, discarding call");
            return None;
        }
    };

    let Some(city) = value.get("city").and_then(|c| c.as_str()) else {
        tracing::warn!("Tool call arguments missing city, discarding call");
        return None;
    };

    let days = value
        .get("days")
        .and_then(|d| match d {
            serde_json::Value::String(s) => s.parse::<u32>().ok(),
            serde_json::Value::Number(n) => n.as_u64().map(|n| n as u32),
            _ => None,
        })
        .unwrap_or(1);

    Some(WeatherQuery {
        city: city.to_string(),
        days,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tenki_types::llm::StopReason;

    fn completion_with_calls(calls: Vec<ToolCallRequest>, text: &str) -> Completion {
        Completion {
            id: "cmpl-1".to_string(),
            model: "m".to_string(),
            text: text.to_string(),
            tool_calls: calls,
            stop_reason: StopReason::ToolUse,
        }
    }

    fn weather_call(id: &str, args: &str) -> ToolCallRequest {
        ToolCallRequest {
            id: id.to_string(),
            name: "get_weather".to_string(),
            arguments: args.to_string(),
        }
    }

    #[test]
    fn test_classify_structured_call() {
        let completion =
            completion_with_calls(vec![weather_call("call_1", r#"{"city":"Kyoto, Japan"}"#)], "");
        assert!(matches!(
            classify(&completion),
            CallResolution::StructuredCallFound(call) if call.id == "call_1"
        ));
    }

    #[test]
    fn test_classify_discards_calls_beyond_first() {
        let completion = completion_with_calls(
            vec![
                weather_call("call_1", r#"{"city":"Kyoto, Japan"}"#),
                weather_call("call_2", r#"{"city":"Osaka, Japan"}"#),
            ],
            "",
        );
        match classify(&completion) {
            CallResolution::StructuredCallFound(call) => assert_eq!(call.id, "call_1"),
            other => panic!("expected structured call, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_unknown_tool_name_is_no_call() {
        let completion = completion_with_calls(
            vec![ToolCallRequest {
                id: "call_1".to_string(),
                name: "launch_rockets".to_string(),
                arguments: "{}".to_string(),
            }],
            // A hallucinated call in the text must NOT be picked up when a
            // structured call was present.
            r#"<function=get_weather>{"city": "Kyoto"}</function>"#,
        );
        assert!(matches!(classify(&completion), CallResolution::NoCallFound));
    }

    #[test]
    fn test_classify_hallucinated_call() {
        let completion = completion_with_calls(
            Vec::new(),
            r#"Checking... <function=get_weather>{"city": "Naha, Japan", "days": "5"}</function>"#,
        );
        assert!(matches!(
            classify(&completion),
            CallResolution::HallucinatedCallFound(_)
        ));
    }

    #[test]
    fn test_classify_plain_answer() {
        let completion = completion_with_calls(Vec::new(), "持ち物は傘がおすすめです。");
        assert!(matches!(classify(&completion), CallResolution::NoCallFound));
    }

    #[test]
    fn test_parse_arguments_defaults_days() {
        let query = parse_tool_arguments(r#"{"city": "Kyoto, Japan"}"#).unwrap();
        assert_eq!(
            query,
            WeatherQuery {
                city: "Kyoto, Japan".to_string(),
                days: 1
            }
        );
    }

    #[test]
    fn test_parse_arguments_accepts_string_and_number_days() {
        assert_eq!(
            parse_tool_arguments(r#"{"city": "Kyoto", "days": "5"}"#)
                .unwrap()
                .days,
            5
        );
        assert_eq!(
            parse_tool_arguments(r#"{"city": "Kyoto", "days": 5}"#)
                .unwrap()
                .days,
            5
        );
    }

    #[test]
    fn test_parse_arguments_non_numeric_days_defaults() {
        assert_eq!(
            parse_tool_arguments(r#"{"city": "Kyoto", "days": "week"}"#)
                .unwrap()
                .days,
            1
        );
    }

    #[test]
    fn test_parse_arguments_missing_city_discards() {
        assert!(parse_tool_arguments(r#"{"days": "5"}"#).is_none());
    }

    #[test]
    fn test_parse_arguments_malformed_json_discards() {
        assert!(parse_tool_arguments(r#"{"city": "#).is_none());
    }
}
