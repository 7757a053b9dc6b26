//! OpenWeather geocoding/current/forecast client.
//!
//! Implements the [`WeatherBackend`] port against api.openweathermap.org:
//! direct city geocoding (limit 1), current conditions, and the 5-day
//! 3-hour-step forecast, all in metric units with provider-localized
//! descriptions. Forecast timestamps are converted to the requester-local
//! clock here, so the aggregator only ever sees local naive datetimes.

use chrono::{Local, TimeZone};
use serde::Deserialize;

use tenki_core::weather::provider::WeatherBackend;
use tenki_types::weather::{
    CurrentConditions, ForecastSample, GeoMatch, Locale, WeatherError,
};

const GEO_URL: &str = "http://api.openweathermap.org/geo/1.0/direct";
const CURRENT_URL: &str = "https://api.openweathermap.org/data/2.5/weather";
const FORECAST_URL: &str = "https://api.openweathermap.org/data/2.5/forecast";

/// Client for the OpenWeather APIs.
pub struct OpenWeatherClient {
    http: reqwest::Client,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct GeoEntry {
    lat: f64,
    lon: f64,
    name: String,
    country: String,
}

#[derive(Debug, Deserialize)]
struct MainReading {
    temp: f64,
    #[serde(default)]
    feels_like: f64,
    #[serde(default)]
    humidity: u32,
}

#[derive(Debug, Clone, Deserialize)]
struct ConditionReading {
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct WindReading {
    #[serde(default)]
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    main: MainReading,
    weather: Vec<ConditionReading>,
    #[serde(default)]
    wind: Option<WindReading>,
}

#[derive(Debug, Deserialize)]
struct ForecastEntry {
    dt: i64,
    main: MainReading,
    weather: Vec<ConditionReading>,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    list: Vec<ForecastEntry>,
}

impl OpenWeatherClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<T, WeatherError> {
        let response = self
            .http
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|e| WeatherError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WeatherError::Http(format!("{status}: {body}")));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| WeatherError::Deserialization(e.to_string()))
    }

    fn condition(readings: &[ConditionReading]) -> Result<ConditionReading, WeatherError> {
        readings
            .first()
            .cloned()
            .ok_or_else(|| WeatherError::Deserialization("empty weather array".to_string()))
    }
}

impl WeatherBackend for OpenWeatherClient {
    async fn geocode(&self, query: &str) -> Result<Option<GeoMatch>, WeatherError> {
        if self.api_key.is_empty() {
            return Err(WeatherError::MissingApiKey);
        }

        let entries: Vec<GeoEntry> = self
            .get_json(
                GEO_URL,
                &[
                    ("q", query.to_string()),
                    ("limit", "1".to_string()),
                    ("appid", self.api_key.clone()),
                ],
            )
            .await?;

        Ok(entries.into_iter().next().map(|entry| GeoMatch {
            lat: entry.lat,
            lon: entry.lon,
            name: entry.name,
            country: entry.country,
        }))
    }

    async fn current(
        &self,
        place: &GeoMatch,
        locale: Locale,
    ) -> Result<CurrentConditions, WeatherError> {
        let body: CurrentResponse = self
            .get_json(
                CURRENT_URL,
                &[
                    ("lat", place.lat.to_string()),
                    ("lon", place.lon.to_string()),
                    ("appid", self.api_key.clone()),
                    ("units", "metric".to_string()),
                    ("lang", locale.lang_code().to_string()),
                ],
            )
            .await?;

        let condition = Self::condition(&body.weather)?;

        Ok(CurrentConditions {
            temp: body.main.temp,
            feels_like: body.main.feels_like,
            humidity: body.main.humidity,
            description: condition.description,
            icon: condition.icon,
            wind_speed: body.wind.map(|w| w.speed).unwrap_or_default(),
        })
    }

    async fn forecast(
        &self,
        place: &GeoMatch,
        locale: Locale,
    ) -> Result<Vec<ForecastSample>, WeatherError> {
        let body: ForecastResponse = self
            .get_json(
                FORECAST_URL,
                &[
                    ("lat", place.lat.to_string()),
                    ("lon", place.lon.to_string()),
                    ("appid", self.api_key.clone()),
                    ("units", "metric".to_string()),
                    ("lang", locale.lang_code().to_string()),
                ],
            )
            .await?;

        let samples = body
            .list
            .into_iter()
            .filter_map(|entry| {
                let at = Local.timestamp_opt(entry.dt, 0).single()?.naive_local();
                let condition = entry.weather.first()?;
                Some(ForecastSample {
                    at,
                    temp: entry.main.temp,
                    description: condition.description.clone(),
                    icon: condition.icon.clone(),
                })
            })
            .collect();

        Ok(samples)
    }
}
