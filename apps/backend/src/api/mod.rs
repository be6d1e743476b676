pub mod rest;
pub mod ws;

use axum::Router;
use tower_http::cors::CorsLayer;

use crate::AppState;

/// Full router: REST endpoints, OpenAPI docs and the WebSocket endpoint
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .merge(rest::create_rest())
        .merge(ws::create_ws())
        .with_state(state)
        .layer(CorsLayer::permissive())
}
