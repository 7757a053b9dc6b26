//! Groq provider configuration.

/// Configuration for the Groq OpenAI-compatible endpoint.
///
/// The model id is not part of the provider config: the cascade sets it
/// per request as it walks the tiers.
pub struct GroqConfig {
    /// API key for authentication.
    pub api_key: String,
    /// Base URL for the API.
    pub base_url: String,
}

/// Groq default configuration.
///
/// Base URL: `https://api.groq.com/openai/v1`
pub fn groq_defaults(api_key: &str) -> GroqConfig {
    GroqConfig {
        api_key: api_key.into(),
        base_url: "https://api.groq.com/openai/v1".into(),
    }
}
