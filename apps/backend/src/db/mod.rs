// Database connection modules
pub mod pg;

// Entity modules
pub mod sessions;

// Re-export common types
pub use sqlx::postgres::PgPool;

/// Handle to the external session record store
#[derive(Clone)]
pub struct Db {
    pub postgres: PgPool,
}

impl Db {
    /// Connect and run migrations
    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let postgres = pg::create_pool(database_url, max_connections).await?;
        Ok(Self { postgres })
    }
}
