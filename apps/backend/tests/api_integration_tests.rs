use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use scoreboard::engine::EngineSettings;
use serde_json::{json, Value};
use tower::ServiceExt; // for `oneshot`

mod utils;
use utils::test_app;

/// Send one request through the router and decode the JSON body
async fn request(app: axum::Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);

    (status, json)
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _) = test_app(EngineSettings::default());

    let (status, body) = request(app, Method::GET, "/api/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Scoreboard is running!");
}

#[tokio::test]
async fn test_create_session_route() {
    let (app, scoreboard) = test_app(EngineSettings::default());

    let (status, body) = request(
        app,
        Method::POST,
        "/api/sessions",
        Some(json!({"code": "r1", "fields": {"period": 2}})),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["code"], "R1");
    assert_eq!(body["period"], 2);

    let stored = scoreboard
        .get_session("R1")
        .await
        .expect("Session should exist");
    assert_eq!(stored.period, 2);
}

#[tokio::test]
async fn test_create_session_with_clock_sets_reset_values() {
    let (app, scoreboard) = test_app(EngineSettings::default());

    let (status, body) = request(
        app,
        Method::POST,
        "/api/sessions",
        Some(json!({"code": "Q1", "fields": {"game_clock": "12:00", "shot_clock": "30"}})),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["preset"]["game_clock"], "12:00");
    assert_eq!(body["preset"]["shot_clock"], 30);

    scoreboard
        .submit_update(
            "Q1",
            json!({"game_clock": 5}).as_object().unwrap(),
            &scoreboard::models::domain::Origin::anonymous(),
        )
        .await
        .expect("Failed to update");
    let report = scoreboard
        .clock_action("Q1", scoreboard::models::domain::ClockAction::Reset)
        .await
        .expect("Failed to reset");
    assert_eq!(report.session.game_clock.to_string(), "12:00");
}

#[tokio::test]
async fn test_patch_route() {
    let (app, scoreboard) = test_app(EngineSettings::default());
    scoreboard
        .create_session("P1", &serde_json::Map::new())
        .await
        .expect("Failed to create session");

    let (status, body) = request(
        app,
        Method::PATCH,
        "/api/sessions/P1",
        Some(json!({"fields": {"home_timeouts": {"delta": 1}, "ended": true}})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["home_timeouts"], 1);
    assert_eq!(body["ended"], true);
}

#[tokio::test]
async fn test_unknown_clock_action_rejected() {
    let (app, scoreboard) = test_app(EngineSettings::default());
    scoreboard
        .create_session("C1", &serde_json::Map::new())
        .await
        .expect("Failed to create session");

    let (status, body) = request(
        app,
        Method::POST,
        "/api/sessions/C1/clock",
        Some(json!({"action": "rewind"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_REQUEST");
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_malformed_bodies_use_error_envelope() {
    let (app, scoreboard) = test_app(EngineSettings::default());
    scoreboard
        .create_session("M1", &serde_json::Map::new())
        .await
        .expect("Failed to create session");

    let cases = [
        (Method::PATCH, "/api/sessions/M1", json!({"fields": [1, 2]})),
        (Method::PATCH, "/api/sessions/M1", json!("home_score")),
        (Method::POST, "/api/sessions", json!({"fields": {}})),
        (Method::POST, "/api/sessions/M1/signal", json!({"signal": "horn"})),
    ];

    for (method, uri, body) in cases {
        let (status, error) = request(app.clone(), method, uri, Some(body.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{} {}", uri, body);
        assert_eq!(error["code"], "INVALID_REQUEST", "{} {}", uri, body);
    }

    let session = scoreboard.get_session("M1").await.expect("Session exists");
    assert_eq!(session.revision, 0);
}

#[tokio::test]
async fn test_unknown_route_404() {
    let (app, _) = test_app(EngineSettings::default());

    let (status, _) = request(app, Method::GET, "/api/nonexistent", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}
