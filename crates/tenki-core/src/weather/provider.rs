//! WeatherBackend trait definition.
//!
//! The seam between the forecast aggregator and the hosted
//! geocoding/weather provider. Implementations live in tenki-infra
//! (e.g. `OpenWeatherClient`).

use tenki_types::weather::{
    CurrentConditions, ForecastSample, GeoMatch, Locale, WeatherError,
};

/// Trait for geocoding/weather provider backends.
///
/// `forecast` returns raw samples at roughly 3-hour resolution with
/// timestamps already converted to the requester-local clock; the
/// aggregator owns all bucketing and labelling.
pub trait WeatherBackend: Send + Sync {
    /// Resolve a free-text city query to coordinates. `Ok(None)` means the
    /// provider had no match (not an error).
    fn geocode(
        &self,
        query: &str,
    ) -> impl std::future::Future<Output = Result<Option<GeoMatch>, WeatherError>> + Send;

    /// Current conditions at a resolved location.
    fn current(
        &self,
        place: &GeoMatch,
        locale: Locale,
    ) -> impl std::future::Future<Output = Result<CurrentConditions, WeatherError>> + Send;

    /// Multi-day forecast samples at a resolved location, chronological.
    fn forecast(
        &self,
        place: &GeoMatch,
        locale: Locale,
    ) -> impl std::future::Future<Output = Result<Vec<ForecastSample>, WeatherError>> + Send;
}
