use anyhow::Context;
use std::sync::Arc;

use scoreboard::api;
use scoreboard::config::Config;
use scoreboard::db::Db;
use scoreboard::engine::recorder::SessionRecorder;
use scoreboard::engine::store::CommitSink;
use scoreboard::engine::Scoreboard;
use scoreboard::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables (optional .env)
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            return Err(e).context("Failed to load .env");
        }
    }

    env_logger::init();

    let config = Config::load().context("Failed to load configuration")?;
    let addr = config.bind_address();

    // Optional record store: restore sessions and persist every commit
    let mut sinks: Vec<Arc<dyn CommitSink>> = Vec::new();
    let mut restored = Vec::new();
    if let Some(url) = &config.database.url {
        let db = Db::connect(url, config.database.max_connections)
            .await
            .context("Failed to connect to PostgreSQL")?;
        log::info!("Connected to PostgreSQL");

        restored = db
            .load_sessions()
            .await
            .context("Failed to load persisted sessions")?;

        let (recorder, _writer) = SessionRecorder::spawn(db);
        sinks.push(Arc::new(recorder));
    } else {
        log::info!("No database configured, sessions are kept in memory only");
    }

    let scoreboard = Arc::new(Scoreboard::with_sinks(config.engine_settings(), sinks));
    scoreboard.restore(restored).await;

    let app = api::create_app(AppState::new(scoreboard, config.ws_settings()));

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context(format!("Failed to bind to {}", addr))?;

    println!("🏀 Scoreboard server running on http://{}", addr);
    println!("🔌 WebSocket endpoint: ws://{}/ws", addr);
    println!("📖 OpenAPI docs: http://{}/api/docs", addr);
    println!("📋 OpenAPI spec: http://{}/api/openapi.json", addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
