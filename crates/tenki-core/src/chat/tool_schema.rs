//! Schema for the single registered capability.
//!
//! Exactly one tool exists: `get_weather(city, days)`. The schema is passed
//! to the completion service on every turn where tool use is allowed.
//! Unknown tool names coming back from the model are ignored, never
//! executed.

use serde_json::json;

use tenki_types::llm::ToolSpec;

/// Name of the weather lookup capability.
pub const WEATHER_TOOL: &str = "get_weather";

/// Build the `get_weather` tool schema.
///
/// `days` is a string on the wire ("1" or "5") because several served
/// models produce more reliable argument encodings for string enums than
/// for integers.
pub fn weather_tool() -> ToolSpec {
    ToolSpec {
        name: WEATHER_TOOL.to_string(),
        description: "Get the current weather and 5-day forecast for a specific city. \
                      Use this when the user asks about weather, travel plans, outdoor \
                      activities, or any location-based question. Always include country \
                      or region for accuracy (e.g., 'Patna, India' not just 'Bihar')."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "city": {
                    "type": "string",
                    "description": "The city name. If responding in Japanese, use ENGLISH names and append ', Japan' (e.g., 'Kyoto, Japan' instead of '京都'). This ensures accuracy."
                },
                "days": {
                    "type": "string",
                    "description": "Number of forecast days to fetch (e.g., '1' or '5'). Default to '1'. Set to '5' ONLY if user explicitly asks for multiple days."
                }
            },
            "required": ["city"]
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weather_tool_shape() {
        let tool = weather_tool();
        assert_eq!(tool.name, "get_weather");
        assert_eq!(tool.parameters["required"][0], "city");
        assert_eq!(tool.parameters["properties"]["days"]["type"], "string");
    }
}
