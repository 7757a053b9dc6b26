//! Application state wiring infra into core.
//!
//! Services are generic over the provider traits; AppState pins them to
//! the concrete infra implementations. Provider clients are constructed
//! once and shared across requests as injected collaborators -- no ambient
//! globals.

use std::path::Path;
use std::sync::Arc;

use tenki_core::chat::service::ChatService;
use tenki_core::llm::box_provider::BoxCompletionBackend;
use tenki_core::llm::cascade::ModelCascade;
use tenki_core::weather::aggregate::ForecastAggregator;
use tenki_infra::config::load_config;
use tenki_infra::llm::groq::config::GroqConfig;
use tenki_infra::llm::groq::transcribe::GroqTranscriber;
use tenki_infra::llm::groq::GroqProvider;
use tenki_infra::weather::openweather::OpenWeatherClient;

/// Concrete chat service pinned to the infra weather backend.
pub type ConcreteChatService = ChatService<OpenWeatherClient>;

/// Shared application state for CLI commands and HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub chat_service: Arc<ConcreteChatService>,
    pub transcriber: Arc<GroqTranscriber>,
}

impl AppState {
    /// Load configuration and wire the services.
    pub async fn init(config_path: Option<&Path>) -> anyhow::Result<Self> {
        let config = load_config(config_path).await;

        if config.groq.api_key.is_empty() {
            tracing::warn!("GROQ_API_KEY is not set; completion requests will fail");
        }
        if config.openweather.api_key.is_empty() {
            tracing::warn!("OPENWEATHER_API_KEY is not set; weather lookups will fail");
        }

        let provider = GroqProvider::new(GroqConfig {
            api_key: config.groq.api_key.clone(),
            base_url: config.groq.base_url.clone(),
        });
        let cascade = ModelCascade::new(
            BoxCompletionBackend::new(provider),
            config.models.clone(),
            config.request.clone(),
        );
        let aggregator =
            ForecastAggregator::new(OpenWeatherClient::new(config.openweather.api_key.clone()));

        let transcriber = GroqTranscriber::new(
            config.groq.api_key.clone(),
            config.groq.base_url.clone(),
            config.groq.whisper_model.clone(),
        );

        Ok(Self {
            chat_service: Arc::new(ChatService::new(cascade, aggregator)),
            transcriber: Arc::new(transcriber),
        })
    }
}
