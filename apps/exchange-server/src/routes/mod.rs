//! Route modules for the exchange server

pub mod exchange;
pub mod health;

use axum::{extract::DefaultBodyLimit, routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the application router
pub fn app(state: AppState) -> Router {
    let route = state.config().server.route.clone();
    let body_limit = usize::try_from(state.config().exchange.max_file_size).unwrap_or(usize::MAX);

    Router::new()
        .route("/health", get(health::health_check))
        .route(&route, get(exchange::exchange).post(exchange::exchange))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
