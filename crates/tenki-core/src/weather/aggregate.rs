//! Forecast aggregation.
//!
//! Turns raw geocoding + current + 3-hour-step forecast data into a
//! normalized [`WeatherSnapshot`]: one point for a current-conditions
//! request, up to five daily buckets for a forecast request, each labelled
//! relative to the requester's calendar day.

use chrono::{Local, NaiveDate, Timelike};

use tenki_types::weather::{
    CurrentConditions, ForecastPoint, ForecastSample, GeoMatch, Locale, WeatherSnapshot,
};

use super::normalize::normalize_query;
use super::provider::WeatherBackend;

/// Upper bound on daily forecast buckets.
const MAX_FORECAST_DAYS: usize = 5;

/// Fetches and aggregates weather for the conversation pipeline.
///
/// Lookup misses and provider failures both degrade to `None`; callers
/// treat `None` as "no weather available" and proceed conversationally.
pub struct ForecastAggregator<W: WeatherBackend> {
    backend: W,
}

impl<W: WeatherBackend> ForecastAggregator<W> {
    pub fn new(backend: W) -> Self {
        Self { backend }
    }

    /// Resolve a city and build its snapshot. `days <= 1` yields a single
    /// current-conditions point; larger values yield daily buckets.
    pub async fn fetch(&self, city: &str, locale: Locale, days: u32) -> Option<WeatherSnapshot> {
        match self.try_fetch(city, locale, days).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::warn!(city, error = %err, "Weather fetch failed");
                None
            }
        }
    }

    async fn try_fetch(
        &self,
        city: &str,
        locale: Locale,
        days: u32,
    ) -> Result<Option<WeatherSnapshot>, tenki_types::weather::WeatherError> {
        let normalized = normalize_query(city, locale);
        let mut place = self.backend.geocode(&normalized).await?;

        // The normalized form occasionally misses places the raw query hits.
        if place.is_none() && normalized != city {
            tracing::debug!(%normalized, raw = city, "Normalized query missed, retrying raw");
            place = self.backend.geocode(city).await?;
        }

        let Some(place) = place else {
            tracing::debug!(city, "No geocoding match on either query");
            return Ok(None);
        };

        let current = self.backend.current(&place, locale).await?;
        let samples = self.backend.forecast(&place, locale).await?;
        let today = Local::now().date_naive();

        Ok(Some(build_snapshot(
            &place, &current, &samples, days, today, locale,
        )))
    }
}

/// Collapse 3-hour samples into one representative per calendar day.
///
/// Within a day the sample whose hour is closest to noon wins; samples are
/// visited chronologically and the held sample is only replaced when a
/// strictly closer one appears, so the earlier of two equidistant samples
/// wins. At most `max_days` days are kept, in first-seen order.
pub fn bucket_daily(samples: &[ForecastSample], max_days: usize) -> Vec<ForecastSample> {
    let mut held: Vec<(NaiveDate, ForecastSample)> = Vec::new();

    for sample in samples {
        let day = sample.at.date();
        match held.iter_mut().find(|(d, _)| *d == day) {
            Some((_, existing)) => {
                let held_distance = (existing.at.hour() as i32 - 12).abs();
                let distance = (sample.at.hour() as i32 - 12).abs();
                if distance < held_distance {
                    *existing = sample.clone();
                }
            }
            None => held.push((day, sample.clone())),
        }
    }

    held.truncate(max_days);
    held.into_iter().map(|(_, sample)| sample).collect()
}

fn weekday_kanji(date: NaiveDate) -> &'static str {
    use chrono::{Datelike, Weekday};
    match date.weekday() {
        Weekday::Mon => "月",
        Weekday::Tue => "火",
        Weekday::Wed => "水",
        Weekday::Thu => "木",
        Weekday::Fri => "金",
        Weekday::Sat => "土",
        Weekday::Sun => "日",
    }
}

/// Relative date token for a forecast bucket, computed against the
/// requester's current date -- never the provider's.
pub fn date_label(date: NaiveDate, today: NaiveDate, locale: Locale) -> String {
    if date == today {
        return match locale {
            Locale::Ja => "今日".to_string(),
            Locale::En => "Today".to_string(),
        };
    }
    if Some(date) == today.succ_opt() {
        return match locale {
            Locale::Ja => "明日".to_string(),
            Locale::En => "Tomorrow".to_string(),
        };
    }
    match locale {
        Locale::Ja => {
            use chrono::Datelike;
            format!("{}月{}日({})", date.month(), date.day(), weekday_kanji(date))
        }
        Locale::En => date.format("%a, %b %-d").to_string(),
    }
}

/// Assemble the snapshot from resolved place, current conditions, and raw
/// forecast samples.
///
/// The first bucket is overwritten with the current-conditions reading
/// (label `Today`, time token `Now`) whenever its calendar day is today.
pub fn build_snapshot(
    place: &GeoMatch,
    current: &CurrentConditions,
    samples: &[ForecastSample],
    days: u32,
    today: NaiveDate,
    locale: Locale,
) -> WeatherSnapshot {
    let selected = if days > 1 {
        bucket_daily(samples, MAX_FORECAST_DAYS)
    } else {
        samples.iter().take(1).cloned().collect()
    };

    let forecast = selected
        .iter()
        .enumerate()
        .map(|(index, sample)| {
            let label = date_label(sample.at.date(), today, locale);
            if index == 0 && sample.at.date() == today {
                ForecastPoint {
                    label,
                    time: "Now".to_string(),
                    temp: current.temp.round() as i32,
                    description: current.description.clone(),
                    icon: current.icon.clone(),
                }
            } else {
                ForecastPoint {
                    label,
                    time: sample.at.format("%H:%M").to_string(),
                    temp: sample.temp.round() as i32,
                    description: sample.description.clone(),
                    icon: sample.icon.clone(),
                }
            }
        })
        .collect();

    WeatherSnapshot {
        city: place.name.clone(),
        country: place.country.clone(),
        temp: current.temp.round() as i32,
        feels_like: current.feels_like.round() as i32,
        humidity: current.humidity,
        description: current.description.clone(),
        icon: current.icon.clone(),
        wind_speed: current.wind_speed,
        forecast,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use std::sync::Mutex;

    use tenki_types::weather::WeatherError;

    fn at(date: &str, hour: u32) -> NaiveDateTime {
        date.parse::<NaiveDate>()
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn sample(date: &str, hour: u32, temp: f64) -> ForecastSample {
        ForecastSample {
            at: at(date, hour),
            temp,
            description: "cloudy".to_string(),
            icon: "03d".to_string(),
        }
    }

    /// The synthetic 3-hour grid from 2019-01-01T00:00 through 2019-01-05T21:00.
    fn three_hour_grid() -> Vec<ForecastSample> {
        let mut samples = Vec::new();
        for day in 1..=5 {
            for hour in (0..24).step_by(3) {
                samples.push(sample(&format!("2019-01-{day:02}"), hour, day as f64));
            }
        }
        samples
    }

    fn place() -> GeoMatch {
        GeoMatch {
            lat: 35.0116,
            lon: 135.7681,
            name: "Kyoto".to_string(),
            country: "JP".to_string(),
        }
    }

    fn current() -> CurrentConditions {
        CurrentConditions {
            temp: 21.4,
            feels_like: 20.6,
            humidity: 58,
            description: "clear sky".to_string(),
            icon: "01d".to_string(),
            wind_speed: 3.1,
        }
    }

    #[test]
    fn test_bucketing_selects_noon_sample_per_day() {
        let buckets = bucket_daily(&three_hour_grid(), 5);
        assert_eq!(buckets.len(), 5);
        for (i, bucket) in buckets.iter().enumerate() {
            assert_eq!(bucket.at.date().to_string(), format!("2019-01-0{}", i + 1));
            assert_eq!(bucket.at.hour(), 12);
        }
    }

    #[test]
    fn test_bucketing_tie_break_prefers_earlier_sample() {
        // 09:00 and 15:00 are both 3h from noon; the earlier one wins.
        let samples = vec![
            sample("2019-01-01", 9, 5.0),
            sample("2019-01-01", 15, 9.0),
        ];
        let buckets = bucket_daily(&samples, 5);
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].at.hour(), 9);
    }

    #[test]
    fn test_bucketing_truncates_to_max_days() {
        let mut samples = three_hour_grid();
        samples.push(sample("2019-01-06", 12, 1.0));
        let buckets = bucket_daily(&samples, 5);
        assert_eq!(buckets.len(), 5);
        assert_eq!(buckets.last().unwrap().at.date().to_string(), "2019-01-05");
    }

    #[test]
    fn test_date_label_relative_tokens() {
        let today = "2019-01-01".parse::<NaiveDate>().unwrap();
        assert_eq!(date_label(today, today, Locale::En), "Today");
        assert_eq!(date_label(today, today, Locale::Ja), "今日");

        let tomorrow = "2019-01-02".parse::<NaiveDate>().unwrap();
        assert_eq!(date_label(tomorrow, today, Locale::En), "Tomorrow");
        assert_eq!(date_label(tomorrow, today, Locale::Ja), "明日");

        // 2019-01-03 was a Thursday.
        let later = "2019-01-03".parse::<NaiveDate>().unwrap();
        assert_eq!(date_label(later, today, Locale::En), "Thu, Jan 3");
        assert_eq!(date_label(later, today, Locale::Ja), "1月3日(木)");
    }

    #[test]
    fn test_first_bucket_today_overwritten_with_current_conditions() {
        let today = "2019-01-01".parse::<NaiveDate>().unwrap();
        let snapshot = build_snapshot(&place(), &current(), &three_hour_grid(), 5, today, Locale::En);

        assert_eq!(snapshot.forecast.len(), 5);
        let first = &snapshot.forecast[0];
        assert_eq!(first.label, "Today");
        assert_eq!(first.time, "Now");
        // Values come from the current-conditions reading, not the forecast
        // sample (which holds temp 1.0 on day one).
        assert_eq!(first.temp, 21);
        assert_eq!(first.description, "clear sky");

        let second = &snapshot.forecast[1];
        assert_eq!(second.label, "Tomorrow");
        assert_eq!(second.time, "12:00");
        assert_eq!(second.temp, 2);
    }

    #[test]
    fn test_first_bucket_not_today_keeps_forecast_values() {
        // Request window starts tomorrow from the requester's perspective.
        let today = "2018-12-31".parse::<NaiveDate>().unwrap();
        let snapshot = build_snapshot(&place(), &current(), &three_hour_grid(), 5, today, Locale::En);

        let first = &snapshot.forecast[0];
        assert_eq!(first.label, "Tomorrow");
        assert_eq!(first.time, "12:00");
        assert_eq!(first.temp, 1);
    }

    #[test]
    fn test_single_day_takes_first_sample_only() {
        let today = "2019-01-01".parse::<NaiveDate>().unwrap();
        let snapshot = build_snapshot(&place(), &current(), &three_hour_grid(), 1, today, Locale::En);

        assert_eq!(snapshot.forecast.len(), 1);
        assert_eq!(snapshot.forecast[0].time, "Now");
        assert_eq!(snapshot.city, "Kyoto");
        assert_eq!(snapshot.temp, 21);
        assert_eq!(snapshot.feels_like, 21);
    }

    // --- fetch() against a mock backend ---

    struct MockWeather {
        /// Queries that resolve; everything else misses.
        resolves: Vec<String>,
        geocode_calls: Mutex<Vec<String>>,
        fail_forecast: bool,
    }

    impl MockWeather {
        fn resolving(queries: &[&str]) -> Self {
            Self {
                resolves: queries.iter().map(|q| q.to_string()).collect(),
                geocode_calls: Mutex::new(Vec::new()),
                fail_forecast: false,
            }
        }
    }

    impl WeatherBackend for &'static MockWeather {
        async fn geocode(&self, query: &str) -> Result<Option<GeoMatch>, WeatherError> {
            self.geocode_calls.lock().unwrap().push(query.to_string());
            Ok(self
                .resolves
                .iter()
                .any(|q| q == query)
                .then(place))
        }

        async fn current(
            &self,
            _place: &GeoMatch,
            _locale: Locale,
        ) -> Result<CurrentConditions, WeatherError> {
            Ok(current())
        }

        async fn forecast(
            &self,
            _place: &GeoMatch,
            _locale: Locale,
        ) -> Result<Vec<ForecastSample>, WeatherError> {
            if self.fail_forecast {
                return Err(WeatherError::Http("timeout".to_string()));
            }
            Ok(three_hour_grid())
        }
    }

    fn leak(mock: MockWeather) -> &'static MockWeather {
        Box::leak(Box::new(mock))
    }

    #[tokio::test]
    async fn test_fetch_misses_both_queries_returns_none() {
        let mock = leak(MockWeather::resolving(&[]));
        let aggregator = ForecastAggregator::new(mock);

        let snapshot = aggregator.fetch("Atlantis", Locale::Ja, 1).await;
        assert!(snapshot.is_none());
        // Normalized first, then the raw query.
        assert_eq!(
            *mock.geocode_calls.lock().unwrap(),
            vec!["Atlantis, JP".to_string(), "Atlantis".to_string()]
        );
    }

    #[tokio::test]
    async fn test_fetch_retries_raw_query_after_normalized_miss() {
        let mock = leak(MockWeather::resolving(&["Atlantis"]));
        let aggregator = ForecastAggregator::new(mock);

        let snapshot = aggregator.fetch("Atlantis", Locale::Ja, 1).await;
        assert!(snapshot.is_some());
    }

    #[tokio::test]
    async fn test_fetch_normalized_hit_skips_retry() {
        let mock = leak(MockWeather::resolving(&["Kyoto, JP"]));
        let aggregator = ForecastAggregator::new(mock);

        let snapshot = aggregator.fetch("Kyoto", Locale::Ja, 1).await.unwrap();
        assert_eq!(snapshot.city, "Kyoto");
        assert_eq!(mock.geocode_calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_provider_error_degrades_to_none() {
        let mock = leak(MockWeather {
            resolves: vec!["Kyoto, JP".to_string()],
            geocode_calls: Mutex::new(Vec::new()),
            fail_forecast: true,
        });
        let aggregator = ForecastAggregator::new(mock);

        assert!(aggregator.fetch("Kyoto", Locale::Ja, 1).await.is_none());
    }
}
