//! HTTP presentation layer for the OpenWeatherMap API service.
//!
//! This crate provides:
//! - Route registration (with the `/owmapi` routes behind a config toggle)
//! - Query-parameter handling and the in-body status envelope
//! - Startup wiring for the provider and the forecast transformer

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
