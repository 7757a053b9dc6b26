//! Pseudo-tool-call detection and markup stripping.
//!
//! Some served models, when they fail to take the structured-call path,
//! emit literal markup resembling `<function=get_weather>{"city":"..."}
//! </function>` inside the answer body. [`extract`] recovers the call from
//! that text; [`strip`] removes this and every other known leakage shape so
//! no markup ever reaches the user. `strip` is idempotent.

use std::sync::LazyLock;

use regex::Regex;

use tenki_types::llm::ToolCallRequest;

use super::tool_schema::WEATHER_TOOL;

/// Synthetic call id attached to a call recovered from text.
const RECOVERED_CALL_ID: &str = "recovered-from-text";

static EXTRACT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<function=get_weather>\s*(\{[^}]+\})\s*</function>").unwrap()
});

static DETECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<function=get_weather>").unwrap());

/// The six known leakage shapes, stripped in order: paired function blocks,
/// stray open tags, stray close tags, bracket-style markers, `<call>`
/// blocks, and generic `<tag=value>` residue.
static STRIP_RES: LazyLock<[Regex; 6]> = LazyLock::new(|| {
    [
        Regex::new(r"(?is)<function=[^>]*>.*?</function>").unwrap(),
        Regex::new(r"(?i)<function=[^>]*>").unwrap(),
        Regex::new(r"(?i)</function>").unwrap(),
        Regex::new(r"(?i)\[/?function[^\]]*\]").unwrap(),
        Regex::new(r"(?is)<call>.*?</call>").unwrap(),
        Regex::new(r"(?i)</?[a-z_]+=[^>]*>").unwrap(),
    ]
});

/// Quick test for the hallucinated-call pattern, used by the bounded
/// re-query before committing to text-based argument extraction.
pub fn looks_hallucinated(text: &str) -> bool {
    DETECT_RE.is_match(text)
}

/// Recover a tool call the model emitted as literal text.
///
/// Requires a parseable JSON object with at minimum a `city` field;
/// anything else yields `None` (logged, not fatal).
pub fn extract(text: &str) -> Option<ToolCallRequest> {
    let captures = EXTRACT_RE.captures(text)?;
    let raw = captures.get(1)?.as_str();

    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(args) if args.get("city").and_then(|c| c.as_str()).is_some() => Some(ToolCallRequest {
            id: RECOVERED_CALL_ID.to_string(),
            name: WEATHER_TOOL.to_string(),
            arguments: raw.to_string(),
        }),
        Ok(_) => {
            tracing::warn!("Hallucinated tool call is missing the city field, discarding");
            None
        }
        Err(err) => {
            tracing::warn!(error = %err, "Failed to parse hallucinated tool call, discarding");
            None
        }
    }
}

/// Remove every known leakage shape from a text fragment.
pub fn strip(text: &str) -> String {
    let mut cleaned = text.to_string();
    for re in STRIP_RES.iter() {
        cleaned = re.replace_all(&cleaned, "").into_owned();
    }
    cleaned
}

/// Strip plus whitespace trim, for buffered (non-fragment) responses.
pub fn clean(text: &str) -> String {
    strip(text).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_valid_call() {
        let text = r#"Let me check. <function=get_weather>{"city": "Kyoto, Japan", "days": "1"}</function>"#;
        let call = extract(text).unwrap();
        assert_eq!(call.name, "get_weather");
        assert!(call.arguments.contains("Kyoto, Japan"));
    }

    #[test]
    fn test_extract_is_case_insensitive() {
        let text = r#"<FUNCTION=get_weather>{"city": "Naha"}</FUNCTION>"#;
        assert!(extract(text).is_some());
    }

    #[test]
    fn test_extract_rejects_missing_city() {
        let text = r#"<function=get_weather>{"days": "5"}</function>"#;
        assert!(extract(text).is_none());
    }

    #[test]
    fn test_extract_rejects_malformed_json() {
        let text = r#"<function=get_weather>{"city": </function>"#;
        assert!(extract(text).is_none());
    }

    #[test]
    fn test_extract_ignores_plain_text() {
        assert!(extract("It is sunny in Kyoto today.").is_none());
    }

    #[test]
    fn test_strip_removes_all_six_shapes() {
        let cases = [
            r#"a<function=get_weather>{"city":"x"}</function>b"#,
            "a<function=get_weather>b",
            "a</function>b",
            "a[function=get_weather]b[/function]b",
            "a<call>{\"city\":\"x\"}</call>b",
            "a<tool=get_weather>b</tool=get_weather>b",
        ];
        for case in cases {
            let cleaned = strip(case);
            assert!(!cleaned.contains('<') && !cleaned.contains('>'), "leaked: {cleaned}");
            assert!(!cleaned.contains("[function"), "leaked: {cleaned}");
            assert!(cleaned.starts_with('a'), "lost surrounding text: {cleaned}");
        }
    }

    #[test]
    fn test_strip_is_idempotent() {
        let samples = [
            r#"before <function=get_weather>{"city": "Kyoto"}</function> after"#,
            "plain text with no markup",
            "<call>x</call><function=a> [function] </function>",
            "今日の京都は晴れです。",
        ];
        for sample in samples {
            let once = strip(sample);
            let twice = strip(&once);
            assert_eq!(once, twice, "not idempotent for: {sample}");
        }
    }

    #[test]
    fn test_strip_preserves_surrounding_text() {
        let text = r#"Checking the weather. <function=get_weather>{"city": "Kyoto"}</function> One moment."#;
        assert_eq!(strip(text), "Checking the weather.  One moment.");
    }

    #[test]
    fn test_clean_trims() {
        let text = r#"  <function=get_weather>{"city": "Kyoto"}</function>  "#;
        assert_eq!(clean(text), "");
    }

    #[test]
    fn test_looks_hallucinated() {
        assert!(looks_hallucinated(
            r#"<function=get_weather>{"city": "Kyoto"}"#
        ));
        assert!(looks_hallucinated("<FUNCTION=GET_WEATHER>"));
        assert!(!looks_hallucinated("the weather function is useful"));
    }
}
