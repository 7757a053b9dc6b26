//! Standalone weather endpoint.
//!
//! GET /weather?city=..&lang=..
//!
//! Single-day snapshot through the same aggregator contract the
//! conversation pipeline uses (`days=1`).

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use tenki_types::weather::{Locale, WeatherSnapshot};

use crate::http::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WeatherParams {
    pub city: Option<String>,
    pub lang: Option<String>,
}

/// GET /weather -- current conditions for one city.
pub async fn weather(
    State(state): State<AppState>,
    Query(params): Query<WeatherParams>,
) -> Result<Json<WeatherSnapshot>, AppError> {
    let city = params
        .city
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| AppError::Validation("City required".to_string()))?;

    let locale = match params.lang.as_deref() {
        Some(lang) => lang
            .parse::<Locale>()
            .map_err(AppError::Validation)?,
        None => Locale::default(),
    };

    match state.chat_service.weather().fetch(&city, locale, 1).await {
        Some(snapshot) => Ok(Json(snapshot)),
        None => Err(AppError::NotFound("City not found".to_string())),
    }
}
