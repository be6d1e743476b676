mod utils;

use futures::{SinkExt, StreamExt};
use scoreboard::api::ws::WsSettings;
use scoreboard::engine::EngineSettings;
use scoreboard::models::api::{ClientMessage, ServerMessage};
use scoreboard::models::domain::{ClockAction, SessionCode, SignalKind};
use serde_json::json;
use tokio::time::{timeout, Duration};
use tokio_tungstenite::tungstenite::Message;
use utils::TestServer;

// Type alias for WebSocket stream to reduce verbosity
type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Helper to send a JSON message to WebSocket
async fn send_json<T: serde::Serialize>(ws: &mut WsStream, msg: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string(msg)?;
    ws.send(Message::Text(json.into())).await?;
    Ok(())
}

/// Wait for the next server message, skipping control frames
async fn next_message(ws: &mut WsStream) -> anyhow::Result<ServerMessage> {
    loop {
        let frame = timeout(Duration::from_secs(2), ws.next())
            .await
            .map_err(|_| anyhow::anyhow!("Timed out waiting for a message"))?
            .ok_or_else(|| anyhow::anyhow!("Socket closed"))??;

        if let Message::Text(text) = frame {
            return Ok(serde_json::from_str(&text)?);
        }
    }
}

/// Assert nothing but control frames arrive within `wait`
async fn expect_silence(ws: &mut WsStream, wait: Duration) {
    let deadline = tokio::time::Instant::now() + wait;
    loop {
        match tokio::time::timeout_at(deadline, ws.next()).await {
            Err(_) => return,
            Ok(Some(Ok(Message::Text(text)))) => panic!("Unexpected message: {}", text),
            Ok(Some(Ok(_))) => continue,
            Ok(other) => panic!("Socket ended: {:?}", other),
        }
    }
}

async fn connect(server: &TestServer) -> WsStream {
    let (ws, _) = tokio_tungstenite::connect_async(&server.ws_url("/ws"))
        .await
        .expect("Failed to connect to WebSocket");
    ws
}

async fn join(ws: &mut WsStream, code: &str) -> ServerMessage {
    send_json(
        ws,
        &ClientMessage::Join {
            code: code.to_string(),
        },
    )
    .await
    .expect("Failed to send join");
    next_message(ws).await.expect("Failed to receive join ack")
}

// ============================================================================
// Connection Tests
// ============================================================================

#[tokio::test]
async fn test_ws_application_ping() {
    let server = TestServer::start()
        .await
        .expect("Failed to start test server");
    let mut ws = connect(&server).await;

    send_json(&mut ws, &ClientMessage::Ping)
        .await
        .expect("Failed to send ping");

    let reply = next_message(&mut ws).await.expect("No reply");
    assert_eq!(reply, ServerMessage::Pong);

    ws.close(None).await.expect("Failed to close connection");
}

#[tokio::test]
async fn test_ws_malformed_message_reports_error() {
    let server = TestServer::start()
        .await
        .expect("Failed to start test server");
    let mut ws = connect(&server).await;

    ws.send(Message::Text("{\"type\":\"dance\"}".into()))
        .await
        .expect("Failed to send");

    match next_message(&mut ws).await.expect("No reply") {
        ServerMessage::Error { kind, .. } => assert_eq!(kind, "INVALID_REQUEST"),
        other => panic!("Expected error, got {:?}", other),
    }
}

// ============================================================================
// Join / Leave
// ============================================================================

#[tokio::test]
async fn test_ws_join_receives_current_snapshot() {
    let server = TestServer::start()
        .await
        .expect("Failed to start test server");
    server
        .post(
            "/api/sessions",
            &json!({"code": "ABC1", "fields": {"home_name": "Hawks"}}),
        )
        .await;

    let mut ws = connect(&server).await;
    match join(&mut ws, "abc1").await {
        ServerMessage::Joined { session } => {
            assert_eq!(session.code.as_str(), "ABC1");
            assert_eq!(session.home_name, "Hawks");
        }
        other => panic!("Expected joined, got {:?}", other),
    }
}

#[tokio::test]
async fn test_ws_join_unknown_session_errors() {
    let server = TestServer::start()
        .await
        .expect("Failed to start test server");
    let mut ws = connect(&server).await;

    match join(&mut ws, "NOPE").await {
        ServerMessage::Error { kind, message } => {
            assert_eq!(kind, "SESSION_NOT_FOUND");
            assert!(message.contains("NOPE"));
        }
        other => panic!("Expected error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_ws_updates_reach_all_viewers_in_order() {
    let server = TestServer::start()
        .await
        .expect("Failed to start test server");
    server.post("/api/sessions", &json!({"code": "FAN"})).await;

    let mut viewers = Vec::new();
    for _ in 0..3 {
        let mut ws = connect(&server).await;
        join(&mut ws, "FAN").await;
        viewers.push(ws);
    }

    for score in 1..=3 {
        let response = server
            .patch("/api/sessions/FAN", &json!({"fields": {"home_score": score}}))
            .await;
        assert_eq!(response.status(), 200);
    }

    for ws in viewers.iter_mut() {
        let mut scores = Vec::new();
        for _ in 0..3 {
            match next_message(ws).await.expect("Missing snapshot") {
                ServerMessage::Snapshot { session } => scores.push(session.home_score),
                other => panic!("Expected snapshot, got {:?}", other),
            }
        }
        assert_eq!(scores, vec![1, 2, 3]);
    }
}

#[tokio::test]
async fn test_ws_leave_stops_snapshots() {
    let server = TestServer::start()
        .await
        .expect("Failed to start test server");
    server.post("/api/sessions", &json!({"code": "BYE"})).await;

    let mut ws = connect(&server).await;
    join(&mut ws, "BYE").await;

    send_json(
        &mut ws,
        &ClientMessage::Leave {
            code: "BYE".to_string(),
        },
    )
    .await
    .expect("Failed to send leave");

    match next_message(&mut ws).await.expect("No leave ack") {
        ServerMessage::Left { code } => assert_eq!(code.as_str(), "BYE"),
        other => panic!("Expected left, got {:?}", other),
    }

    server
        .patch("/api/sessions/BYE", &json!({"fields": {"away_score": 1}}))
        .await;

    expect_silence(&mut ws, Duration::from_millis(200)).await;
}

#[tokio::test]
async fn test_ws_disconnect_removes_subscription() {
    let server = TestServer::start()
        .await
        .expect("Failed to start test server");
    server.post("/api/sessions", &json!({"code": "DROP"})).await;

    let mut ws = connect(&server).await;
    join(&mut ws, "DROP").await;

    let code: SessionCode = "DROP".parse().expect("valid code");
    assert_eq!(server.scoreboard.hub().subscriber_count(&code), 1);

    ws.close(None).await.expect("Failed to close connection");

    // Server notices the close asynchronously
    let mut remaining = 1;
    for _ in 0..50 {
        remaining = server.scoreboard.hub().subscriber_count(&code);
        if remaining == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(remaining, 0);
}

// ============================================================================
// Operator actions over the socket
// ============================================================================

#[tokio::test]
async fn test_ws_operator_update_and_errors() {
    let server = TestServer::start()
        .await
        .expect("Failed to start test server");
    server.post("/api/sessions", &json!({"code": "OPS"})).await;

    let mut ws = connect(&server).await;
    join(&mut ws, "OPS").await;

    let fields = json!({"period": {"delta": 1}});
    send_json(
        &mut ws,
        &ClientMessage::Update {
            code: "OPS".to_string(),
            fields: fields.as_object().cloned().expect("object"),
            operator: Some("scorer".to_string()),
        },
    )
    .await
    .expect("Failed to send update");

    match next_message(&mut ws).await.expect("Missing snapshot") {
        ServerMessage::Snapshot { session } => assert_eq!(session.period, 2),
        other => panic!("Expected snapshot, got {:?}", other),
    }

    let bad = json!({"shot_clock": -4});
    send_json(
        &mut ws,
        &ClientMessage::Update {
            code: "OPS".to_string(),
            fields: bad.as_object().cloned().expect("object"),
            operator: None,
        },
    )
    .await
    .expect("Failed to send update");

    match next_message(&mut ws).await.expect("Missing error") {
        ServerMessage::Error { kind, .. } => assert_eq!(kind, "INVALID_FIELD_VALUE"),
        other => panic!("Expected error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_ws_clock_ticks_stream_to_viewer() {
    let settings = EngineSettings {
        tick_period: Duration::from_millis(40),
        ..EngineSettings::default()
    };
    let server = TestServer::start_with(settings, WsSettings::default())
        .await
        .expect("Failed to start test server");
    server.post("/api/sessions", &json!({"code": "TICK"})).await;

    let mut ws = connect(&server).await;
    join(&mut ws, "TICK").await;

    send_json(
        &mut ws,
        &ClientMessage::Clock {
            code: "TICK".to_string(),
            action: ClockAction::Start,
        },
    )
    .await
    .expect("Failed to send clock start");

    let mut clocks = Vec::new();
    for _ in 0..3 {
        match next_message(&mut ws).await.expect("Missing tick") {
            ServerMessage::Snapshot { session } => {
                clocks.push((session.game_clock.to_string(), session.shot_clock))
            }
            other => panic!("Expected snapshot, got {:?}", other),
        }
    }

    assert_eq!(
        clocks,
        vec![
            ("09:59".to_string(), 23),
            ("09:58".to_string(), 22),
            ("09:57".to_string(), 21),
        ]
    );

    send_json(
        &mut ws,
        &ClientMessage::Clock {
            code: "TICK".to_string(),
            action: ClockAction::Pause,
        },
    )
    .await
    .expect("Failed to send clock pause");
}

#[tokio::test]
async fn test_ws_buzzer_signal() {
    let server = TestServer::start()
        .await
        .expect("Failed to start test server");
    server.post("/api/sessions", &json!({"code": "HORN"})).await;

    let mut viewer = connect(&server).await;
    join(&mut viewer, "HORN").await;

    let mut operator = connect(&server).await;
    send_json(
        &mut operator,
        &ClientMessage::Signal {
            code: "HORN".to_string(),
            signal: SignalKind::Buzzer,
        },
    )
    .await
    .expect("Failed to send signal");

    match next_message(&mut viewer).await.expect("Missing signal") {
        ServerMessage::Signal { code, signal } => {
            assert_eq!(code.as_str(), "HORN");
            assert_eq!(signal, SignalKind::Buzzer);
        }
        other => panic!("Expected signal, got {:?}", other),
    }

    // The operator never joined, so it only hears back on failure
    expect_silence(&mut operator, Duration::from_millis(100)).await;
}

// ============================================================================
// Keepalive
// ============================================================================

#[tokio::test]
async fn test_ws_idle_socket_is_closed() {
    let ws_settings = WsSettings {
        ping_interval: Duration::from_millis(50),
        pong_timeout: Duration::from_secs(60),
        idle_timeout: Duration::from_millis(100),
    };
    let server = TestServer::start_with(EngineSettings::default(), ws_settings)
        .await
        .expect("Failed to start test server");

    let mut ws = connect(&server).await;

    // Pings are answered automatically by tungstenite while we read
    let closed = timeout(Duration::from_secs(2), async {
        loop {
            match ws.next().await {
                None | Some(Err(_)) | Some(Ok(Message::Close(_))) => return true,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await
    .unwrap_or(false);

    assert!(closed, "idle socket should be disconnected");
}
