//! Core library for the OpenWeatherMap API service.
//!
//! This crate defines:
//! - Configuration handling
//! - The weather provider abstraction and its OpenWeatherMap client
//! - Shared domain models (snapshots, forecasts, location queries)
//! - The timezone-adjusted normalization of snapshots and forecasts
//!
//! It is used by `owm-server`, but can also be reused by other binaries or services.

pub mod config;
pub mod model;
pub mod provider;
pub mod transform;

pub use config::Config;
pub use model::{
    Coord, ForecastInterval, ForecastResult, LocationQuery, Sun, TimeWindow, WeatherSnapshot,
};
pub use provider::{ProviderError, WeatherProvider, openweather::OpenWeatherProvider};
pub use transform::{
    ForecastTransformer, LocalizedTime, Localizer, NormalizedForecast, NormalizedSnapshot,
    TransformError,
};
