//! Infrastructure layer for Tenki.
//!
//! Contains implementations of the ports defined in `tenki-core`: the Groq
//! completion/transcription clients and the OpenWeather geocoding/weather
//! client, plus configuration loading.

pub mod config;
pub mod llm;
pub mod weather;
