use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::{handlers, state::AppState};

/// Build the router. The `/owmapi` routes are only registered when enabled
/// in configuration; `/health` is always available.
pub fn create_router(state: AppState, routes_enabled: bool) -> Router {
    let mut router = Router::new().route("/health", get(handlers::health));

    if routes_enabled {
        router = router
            .route("/owmapi/current-weather", get(handlers::current_weather))
            .route("/owmapi/forecast", get(handlers::forecast));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
