use testcontainers::runners::AsyncRunner;
use testcontainers_modules::postgres::Postgres;

use axum::Router;
use scoreboard::api;
use scoreboard::api::ws::WsSettings;
use scoreboard::db::Db;
use scoreboard::engine::{EngineSettings, Scoreboard};
use scoreboard::AppState;
use serde_json::Value;
use std::sync::Arc;

/// Test database container setup
#[allow(dead_code)]
pub struct TestDb {
    pub db: Db,
    postgres_container: testcontainers::ContainerAsync<Postgres>,
}

#[allow(dead_code)]
impl TestDb {
    /// Start a PostgreSQL container and run migrations against it
    pub async fn setup() -> anyhow::Result<Self> {
        let postgres_container = Postgres::default()
            .start()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to start PostgreSQL container: {}", e))?;

        let postgres_port = postgres_container
            .get_host_port_ipv4(5432)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to get PostgreSQL port: {}", e))?;

        let postgres_host = postgres_container
            .get_host()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to get PostgreSQL host: {}", e))?;

        let postgres_url = format!(
            "postgres://postgres:postgres@{}:{}/postgres",
            postgres_host, postgres_port
        );

        // Db::connect runs the embedded migrations
        let db = Db::connect(&postgres_url, 5).await?;

        Ok(TestDb {
            db,
            postgres_container,
        })
    }
}

/// Build the full router around a fresh in-memory scoreboard
#[allow(dead_code)]
pub fn test_app(settings: EngineSettings) -> (Router, Arc<Scoreboard>) {
    let scoreboard = Arc::new(Scoreboard::new(settings));
    let app = api::create_app(AppState::new(scoreboard.clone(), WsSettings::default()));
    (app, scoreboard)
}

#[allow(dead_code)]
pub struct TestServer {
    pub address: String,
    pub scoreboard: Arc<Scoreboard>,
    shutdown_tx: tokio::sync::oneshot::Sender<()>,
}

#[allow(dead_code)]
impl TestServer {
    /// Start a test HTTP server on a random available port
    pub async fn start() -> anyhow::Result<Self> {
        Self::start_with(EngineSettings::default(), WsSettings::default()).await
    }

    /// Start with custom engine and socket settings (e.g. a fast clock)
    pub async fn start_with(settings: EngineSettings, ws: WsSettings) -> anyhow::Result<Self> {
        let scoreboard = Arc::new(Scoreboard::new(settings));
        let app = api::create_app(AppState::new(scoreboard.clone(), ws));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let address = format!("http://{}", addr);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        // Spawn server in background so the test body keeps the main task
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed to start");
        });

        // Give server a moment to start
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

        Ok(Self {
            address,
            scoreboard,
            shutdown_tx,
        })
    }

    /// Helper to make a GET request
    pub async fn get(&self, path: &str) -> reqwest::Response {
        reqwest::get(&format!("{}{}", self.address, path))
            .await
            .expect("Failed to make GET request")
    }

    /// Helper to POST a JSON body
    pub async fn post(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client()
            .post(format!("{}{}", self.address, path))
            .json(body)
            .send()
            .await
            .expect("Failed to make POST request")
    }

    /// Helper to PATCH a JSON body
    pub async fn patch(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client()
            .patch(format!("{}{}", self.address, path))
            .json(body)
            .send()
            .await
            .expect("Failed to make PATCH request")
    }

    /// Helper to get a reqwest client for more complex requests
    pub fn client(&self) -> reqwest::Client {
        reqwest::Client::new()
    }

    /// WebSocket URL for `path` on this server
    pub fn ws_url(&self, path: &str) -> String {
        format!("{}{}", self.address.replacen("http://", "ws://", 1), path)
    }
}
