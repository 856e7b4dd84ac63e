use std::sync::Arc;

use owm_core::{ForecastTransformer, WeatherProvider};

/// Shared state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub provider: Arc<dyn WeatherProvider>,
    pub transformer: Arc<ForecastTransformer>,
}

impl AppState {
    pub fn new(provider: Arc<dyn WeatherProvider>, transformer: ForecastTransformer) -> Self {
        Self {
            provider,
            transformer: Arc::new(transformer),
        }
    }
}
