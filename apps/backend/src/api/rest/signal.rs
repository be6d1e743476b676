use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};

use crate::errors::{ErrorResponse, Result};
use crate::models::api::{SignalAccepted, SignalRequest};
use crate::models::domain::SessionCode;
use crate::AppState;

/// Fan a signal (e.g. the buzzer) out to every viewer of a session
#[utoipa::path(
    post,
    path = "/api/sessions/{code}/signal",
    params(
        ("code" = String, Path, description = "Session code (case-insensitive)")
    ),
    request_body = SignalRequest,
    responses(
        (status = 202, description = "Signal queued", body = SignalAccepted),
        (status = 400, description = "Malformed request body", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    tag = "sessions"
)]
pub async fn send_signal(
    State(state): State<AppState>,
    Path(code): Path<String>,
    payload: std::result::Result<Json<SignalRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SignalAccepted>)> {
    let Json(request) = payload?;
    let delivered = state.scoreboard.signal(&code, request.signal).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(SignalAccepted {
            code: SessionCode::parse(&code)?,
            signal: request.signal,
            delivered,
        }),
    ))
}
