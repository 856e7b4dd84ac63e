use std::fmt::Debug;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{ForecastResult, LocationQuery, WeatherSnapshot};

pub mod openweather;

/// Errors surfaced by a weather provider. These cross the HTTP boundary
/// as an in-body `{status, message, code}` envelope, so every variant
/// carries a numeric code via [`ProviderError::code`].
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The upstream API answered with an error body (unknown city,
    /// bad key, quota...).
    #[error("{message}")]
    Api { code: u16, message: String },

    #[error("request to OpenWeatherMap failed: {0}")]
    Transport(String),

    #[error("failed to decode OpenWeatherMap response: {0}")]
    Decode(String),

    #[error("invalid coordinates `{0}`, expected `lat,lon`")]
    InvalidCoordinates(String),
}

impl ProviderError {
    /// Numeric code for the error envelope: the upstream API code where
    /// one exists, 0 otherwise.
    pub fn code(&self) -> u16 {
        match self {
            Self::Api { code, .. } => *code,
            Self::Transport(_) | Self::Decode(_) | Self::InvalidCoordinates(_) => 0,
        }
    }
}

/// A source of current weather and forecast data for a location.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn current_weather(
        &self,
        location: &LocationQuery,
        lang: &str,
        units: &str,
    ) -> Result<WeatherSnapshot, ProviderError>;

    async fn forecast(
        &self,
        location: &LocationQuery,
        lang: &str,
        units: &str,
        days: u32,
    ) -> Result<ForecastResult, ProviderError>;
}
