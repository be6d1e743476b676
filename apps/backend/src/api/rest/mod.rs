use axum::{
    routing::{get, post},
    Router,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::errors::ErrorResponse;
use crate::models::api::{
    ClockRequest, CreateSessionRequest, SignalAccepted, SignalRequest, UpdateSessionRequest,
};
use crate::models::domain::{ClockAction, ClockPreset, ClockReport, ClockState, Session, SignalKind};
use crate::models::ApiResponse;
use crate::AppState;

pub mod clock;
pub mod health;
pub mod sessions;
pub mod signal;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Scoreboard API",
        version = "0.1.0",
        description = "Operator and viewer API for live scoreboards"
    ),
    paths(
        health::health_check,
        sessions::create_session,
        sessions::get_session,
        sessions::update_session,
        clock::clock_action,
        signal::send_signal,
    ),
    components(
        schemas(
            ApiResponse,
            ErrorResponse,
            Session,
            ClockPreset,
            ClockAction,
            ClockState,
            ClockReport,
            SignalKind,
            CreateSessionRequest,
            UpdateSessionRequest,
            ClockRequest,
            SignalRequest,
            SignalAccepted
        )
    ),
    tags(
        (name = "api", description = "General API endpoints"),
        (name = "sessions", description = "Session lifecycle and operator updates"),
        (name = "clock", description = "Game and shot clock control")
    )
)]
pub struct ApiDoc;

pub fn create_rest() -> Router<AppState> {
    Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/sessions", post(sessions::create_session))
        .route(
            "/api/sessions/{code}",
            get(sessions::get_session).patch(sessions::update_session),
        )
        .route("/api/sessions/{code}/clock", post(clock::clock_action))
        .route("/api/sessions/{code}/signal", post(signal::send_signal))
        .merge(SwaggerUi::new("/api/docs").url("/api/openapi.json", ApiDoc::openapi()))
}
