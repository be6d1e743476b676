use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};

use crate::errors::{ErrorResponse, Result};
use crate::models::api::{CreateSessionRequest, UpdateSessionRequest};
use crate::models::domain::{Origin, Session};
use crate::AppState;

/// Create a new scoreboard session
///
/// POST /api/sessions
///
/// The code is trimmed and upper-cased. Optional `fields` override the defaults;
/// `game_clock`/`shot_clock` given here also become the reset values.
#[utoipa::path(
    post,
    path = "/api/sessions",
    request_body = CreateSessionRequest,
    responses(
        (status = 201, description = "Session created", body = Session),
        (status = 400, description = "Invalid code or field", body = ErrorResponse),
        (status = 409, description = "Code already in use", body = ErrorResponse)
    ),
    tag = "sessions"
)]
pub async fn create_session(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreateSessionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Session>)> {
    let Json(request) = payload?;
    let session = state
        .scoreboard
        .create_session(&request.code, &request.fields)
        .await?;

    Ok((StatusCode::CREATED, Json(session)))
}

/// Get the current snapshot of a session
#[utoipa::path(
    get,
    path = "/api/sessions/{code}",
    params(
        ("code" = String, Path, description = "Session code (case-insensitive)")
    ),
    responses(
        (status = 200, description = "Current snapshot", body = Session),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    tag = "sessions"
)]
pub async fn get_session(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<Session>> {
    let session = state.scoreboard.get_session(&code).await?;
    Ok(Json(session))
}

/// Apply operator field updates and broadcast the new snapshot
///
/// PATCH /api/sessions/{code}
///
/// Either every field is applied or none is.
#[utoipa::path(
    patch,
    path = "/api/sessions/{code}",
    params(
        ("code" = String, Path, description = "Session code (case-insensitive)")
    ),
    request_body = UpdateSessionRequest,
    responses(
        (status = 200, description = "Updated snapshot", body = Session),
        (status = 400, description = "Unknown field or invalid value", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    tag = "sessions"
)]
pub async fn update_session(
    State(state): State<AppState>,
    Path(code): Path<String>,
    payload: std::result::Result<Json<UpdateSessionRequest>, JsonRejection>,
) -> Result<Json<Session>> {
    let Json(request) = payload?;
    let origin = request
        .operator
        .map(Origin::new)
        .unwrap_or_else(Origin::anonymous);

    let session = state
        .scoreboard
        .submit_update(&code, &request.fields, &origin)
        .await?;

    Ok(Json(session))
}
