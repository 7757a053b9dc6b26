//! Configuration loader.
//!
//! Reads `config.toml` (explicit path, `TENKI_CONFIG`, or the working
//! directory) and deserializes it into [`TenkiConfig`], falling back to
//! defaults when the file is missing or malformed. API keys from the
//! environment (`GROQ_API_KEY`, `OPENWEATHER_API_KEY`) take precedence
//! over file values.

use std::path::{Path, PathBuf};

use tenki_types::config::TenkiConfig;

/// Load configuration, merging file values with environment overrides.
pub async fn load_config(explicit_path: Option<&Path>) -> TenkiConfig {
    let path = explicit_path
        .map(PathBuf::from)
        .or_else(|| std::env::var("TENKI_CONFIG").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    let mut config = read_config_file(&path).await;
    apply_env_overrides(
        &mut config,
        std::env::var("GROQ_API_KEY").ok(),
        std::env::var("OPENWEATHER_API_KEY").ok(),
    );
    config
}

async fn read_config_file(path: &Path) -> TenkiConfig {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return TenkiConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", path.display());
            return TenkiConfig::default();
        }
    };

    match toml::from_str::<TenkiConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("Failed to parse {}: {err}, using defaults", path.display());
            TenkiConfig::default()
        }
    }
}

/// Environment keys win over file keys; empty values are ignored.
fn apply_env_overrides(
    config: &mut TenkiConfig,
    groq_key: Option<String>,
    openweather_key: Option<String>,
) {
    if let Some(key) = groq_key.filter(|k| !k.is_empty()) {
        config.groq.api_key = key;
    }
    if let Some(key) = openweather_key.filter(|k| !k.is_empty()) {
        config.openweather.api_key = key;
    }
}
