//! Weather domain types.
//!
//! [`WeatherSnapshot`] is the normalized digest handed to the model and the
//! caller: current conditions plus one to five daily forecast points. The
//! raw provider shapes ([`GeoMatch`], [`CurrentConditions`],
//! [`ForecastSample`]) are what the weather port returns before aggregation.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Response locale for the conversation and weather descriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Ja,
    En,
}

impl Locale {
    /// Two-letter language code used by the hosted providers.
    pub fn lang_code(self) -> &'static str {
        match self {
            Locale::Ja => "ja",
            Locale::En => "en",
        }
    }

    /// Apology shown when no answer could be generated.
    pub fn apology(self) -> &'static str {
        match self {
            Locale::Ja => "申し訳ありません。回答を生成できませんでした。",
            Locale::En => "Sorry, I couldn't generate a response.",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.lang_code())
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ja" => Ok(Locale::Ja),
            "en" => Ok(Locale::En),
            other => Err(format!("invalid locale: '{other}'")),
        }
    }
}

/// Normalized weather digest for one city.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub city: String,
    pub country: String,
    /// Current temperature, rounded to whole degrees Celsius.
    pub temp: i32,
    pub feels_like: i32,
    pub humidity: u32,
    pub description: String,
    /// Provider icon code (e.g. "01d").
    pub icon: String,
    pub wind_speed: f64,
    /// Length 1 for a current-conditions request, up to 5 for a forecast.
    pub forecast: Vec<ForecastPoint>,
}

/// One daily bucket of the forecast.
///
/// `label` is a relative date token (`Today`/`Tomorrow`/weekday form)
/// computed against the requester's calendar day at aggregation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub label: String,
    /// Clock-time token for the selected sample, or "Now" for the first
    /// bucket when it represents current conditions.
    pub time: String,
    pub temp: i32,
    pub description: String,
    pub icon: String,
}

/// A geocoding match: resolved place name plus coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoMatch {
    pub lat: f64,
    pub lon: f64,
    pub name: String,
    pub country: String,
}

/// Current conditions as reported by the weather provider.
#[derive(Debug, Clone)]
pub struct CurrentConditions {
    pub temp: f64,
    pub feels_like: f64,
    pub humidity: u32,
    pub description: String,
    pub icon: String,
    pub wind_speed: f64,
}

/// One raw forecast sample (roughly 3-hour resolution).
///
/// `at` is the sample's timestamp already converted to the requester-local
/// clock; daily bucketing groups on its calendar date.
#[derive(Debug, Clone)]
pub struct ForecastSample {
    pub at: NaiveDateTime,
    pub temp: f64,
    pub description: String,
    pub icon: String,
}

/// Errors from the geocoding/weather provider.
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("weather provider request failed: {0}")]
    Http(String),

    #[error("weather provider returned an unexpected shape: {0}")]
    Deserialization(String),

    #[error("weather provider API key is not configured")]
    MissingApiKey,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locale_roundtrip() {
        for locale in [Locale::Ja, Locale::En] {
            let parsed: Locale = locale.lang_code().parse().unwrap();
            assert_eq!(locale, parsed);
        }
    }

    #[test]
    fn test_locale_default_is_japanese() {
        assert_eq!(Locale::default(), Locale::Ja);
    }

    #[test]
    fn test_locale_serde() {
        let json = serde_json::to_string(&Locale::En).unwrap();
        assert_eq!(json, "\"en\"");
        let parsed: Locale = serde_json::from_str("\"ja\"").unwrap();
        assert_eq!(parsed, Locale::Ja);
    }

    #[test]
    fn test_snapshot_serde_field_names() {
        let snapshot = WeatherSnapshot {
            city: "Kyoto".to_string(),
            country: "JP".to_string(),
            temp: 21,
            feels_like: 20,
            humidity: 55,
            description: "clear sky".to_string(),
            icon: "01d".to_string(),
            wind_speed: 3.2,
            forecast: vec![ForecastPoint {
                label: "Today".to_string(),
                time: "Now".to_string(),
                temp: 21,
                description: "clear sky".to_string(),
                icon: "01d".to_string(),
            }],
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"feels_like\":20"));
        assert!(json.contains("\"wind_speed\":3.2"));
        assert!(json.contains("\"label\":\"Today\""));
    }
}
