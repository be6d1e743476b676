use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};

use crate::errors::{ErrorResponse, Result};
use crate::models::api::ClockRequest;
use crate::models::domain::ClockReport;
use crate::AppState;

/// Start, pause or reset the session clock
///
/// POST /api/sessions/{code}/clock
///
/// Actions that do not apply in the current state succeed with `applied: false`.
#[utoipa::path(
    post,
    path = "/api/sessions/{code}/clock",
    params(
        ("code" = String, Path, description = "Session code (case-insensitive)")
    ),
    request_body = ClockRequest,
    responses(
        (status = 200, description = "Clock state after the action", body = ClockReport),
        (status = 400, description = "Malformed request body", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    tag = "clock"
)]
pub async fn clock_action(
    State(state): State<AppState>,
    Path(code): Path<String>,
    payload: std::result::Result<Json<ClockRequest>, JsonRejection>,
) -> Result<Json<ClockReport>> {
    let Json(request) = payload?;
    let report = state
        .scoreboard
        .clock_action(&code, request.action)
        .await?;

    Ok(Json(report))
}
