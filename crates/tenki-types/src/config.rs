//! Service configuration.
//!
//! Deserialized from `config.toml` by the infra loader; every field has a
//! default so a missing or partial file still yields a runnable config.
//! API keys are normally supplied via environment variables and merged in
//! by the loader.

use serde::{Deserialize, Serialize};

/// Top-level configuration for the Tenki service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TenkiConfig {
    #[serde(default)]
    pub groq: GroqSettings,
    #[serde(default)]
    pub openweather: OpenWeatherSettings,
    #[serde(default)]
    pub models: ModelTiers,
    #[serde(default)]
    pub request: RequestSettings,
}

/// Completion/transcription provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroqSettings {
    /// API key; overridden by `GROQ_API_KEY` when set.
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_groq_base_url")]
    pub base_url: String,
    #[serde(default = "default_whisper_model")]
    pub whisper_model: String,
}

impl Default for GroqSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_groq_base_url(),
            whisper_model: default_whisper_model(),
        }
    }
}

/// Geocoding/weather provider settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenWeatherSettings {
    /// API key; overridden by `OPENWEATHER_API_KEY` when set.
    #[serde(default)]
    pub api_key: String,
}

/// The ranked model tiers of the fallback cascade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelTiers {
    #[serde(default = "default_primary")]
    pub primary: String,
    #[serde(default = "default_secondary")]
    pub secondary: String,
    #[serde(default = "default_tertiary")]
    pub tertiary: String,
}

impl Default for ModelTiers {
    fn default() -> Self {
        Self {
            primary: default_primary(),
            secondary: default_secondary(),
            tertiary: default_tertiary(),
        }
    }
}

/// Per-request generation limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestSettings {
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_followup_max_tokens")]
    pub followup_max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
}

impl Default for RequestSettings {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            followup_max_tokens: default_followup_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

fn default_groq_base_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_whisper_model() -> String {
    "whisper-large-v3".to_string()
}

fn default_primary() -> String {
    "llama-3.3-70b-versatile".to_string()
}

fn default_secondary() -> String {
    "meta-llama/llama-4-scout-17b-16e-instruct".to_string()
}

fn default_tertiary() -> String {
    "llama-3.1-8b-instant".to_string()
}

fn default_max_tokens() -> u32 {
    1500
}

fn default_followup_max_tokens() -> u32 {
    1000
}

fn default_temperature() -> f64 {
    0.7
}
