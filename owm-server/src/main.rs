//! HTTP server for the OpenWeatherMap API service.

use std::sync::Arc;

use anyhow::Context;
use owm_core::{Config, ForecastTransformer, Localizer, OpenWeatherProvider, WeatherProvider};
use owm_server::{routes, state::AppState};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "owm_server=debug,owm_core=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load configuration")?;
    info!(
        listen = %config.listen,
        timezone = %config.timezone,
        routes_enabled = config.routes_enabled,
        "Configuration loaded"
    );

    let localizer = Localizer::from_name(&config.timezone)
        .with_context(|| format!("Invalid `timezone` in configuration: {}", config.timezone))?;

    let api_key = config.api_key()?;
    let provider: Arc<dyn WeatherProvider> = Arc::new(OpenWeatherProvider::new(api_key));

    let state = AppState::new(provider, ForecastTransformer::new(localizer));

    if !config.routes_enabled {
        warn!("`routes_enabled` is off, the /owmapi routes will not be served");
    }
    let app = routes::create_router(state, config.routes_enabled);

    let listener = TcpListener::bind(&config.listen)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen))?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutting down");
    }
}
