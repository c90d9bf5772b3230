/// netgauge HTTP server: hosts the transfer engine behind
/// `GET /download` and `POST /upload`.

mod body;
pub mod config;
pub mod routes;

use axum::{
    Router,
    http::{HeaderValue, header},
    routing::{get, post},
};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

pub use crate::config::Config;
pub use crate::routes::AppState;

/// Build the router with all routes and layers.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/download", get(routes::download).options(routes::preflight))
        .route("/upload", post(routes::upload).options(routes::preflight))
        .route("/health", get(routes::health))
        // Browsers measure cross-origin.
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
