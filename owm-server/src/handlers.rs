use axum::{
    Json,
    extract::{Query, State},
};
use owm_core::{LocationQuery, NormalizedForecast, NormalizedSnapshot, ProviderError};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{error::ApiError, state::AppState};

/// In-body response envelope. Provider failures deliberately keep HTTP 200
/// and report their status here instead.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Envelope<T> {
    Ok { data: T },
    Error { message: String, code: u16 },
}

impl<T> Envelope<T> {
    fn provider_error(err: &ProviderError) -> Self {
        Self::Error {
            message: err.to_string(),
            code: err.code(),
        }
    }
}

fn default_lang() -> String {
    "en".to_owned()
}

fn default_units() -> String {
    "metric".to_owned()
}

const fn default_days() -> u32 {
    5
}

#[derive(Debug, Deserialize)]
pub struct CurrentWeatherParams {
    pub city: Option<String>,
    pub coord: Option<String>,
    #[serde(default = "default_lang")]
    pub lang: String,
    #[serde(default = "default_units")]
    pub units: String,
}

#[derive(Debug, Deserialize)]
pub struct ForecastParams {
    pub city: Option<String>,
    pub coord: Option<String>,
    #[serde(default = "default_lang")]
    pub lang: String,
    #[serde(default = "default_units")]
    pub units: String,
    #[serde(default = "default_days")]
    pub days: u32,
}

/// `GET /owmapi/current-weather`
pub async fn current_weather(
    State(state): State<AppState>,
    Query(params): Query<CurrentWeatherParams>,
) -> Result<Json<Envelope<NormalizedSnapshot>>, ApiError> {
    let location =
        LocationQuery::from_params(params.city.as_deref(), params.coord.as_deref())
            .ok_or(ApiError::MissingLocation)?;

    match state
        .provider
        .current_weather(&location, &params.lang, &params.units)
        .await
    {
        Ok(snapshot) => {
            let data = state.transformer.normalize_snapshot(&snapshot)?;
            Ok(Json(Envelope::Ok { data }))
        }
        Err(err) => {
            warn!(%location, %err, "current weather lookup failed");
            Ok(Json(Envelope::provider_error(&err)))
        }
    }
}

/// `GET /owmapi/forecast`
pub async fn forecast(
    State(state): State<AppState>,
    Query(params): Query<ForecastParams>,
) -> Result<Json<Envelope<NormalizedForecast>>, ApiError> {
    let location =
        LocationQuery::from_params(params.city.as_deref(), params.coord.as_deref())
            .ok_or(ApiError::MissingLocation)?;

    match state
        .provider
        .forecast(&location, &params.lang, &params.units, params.days)
        .await
    {
        Ok(result) => {
            let data = state.transformer.normalize_forecast(&result)?;
            Ok(Json(Envelope::Ok { data }))
        }
        Err(err) => {
            warn!(%location, %err, "forecast lookup failed");
            Ok(Json(Envelope::provider_error(&err)))
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// `GET /health` — liveness, registered regardless of the routes toggle.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
