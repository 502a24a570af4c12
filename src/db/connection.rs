//! Database connection management using sqlx

use crate::config::Settings;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

/// Initialize a connection pool for one database
pub async fn init_pool(settings: &Settings, db_name: &str) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(settings.db_max_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect_with(settings.connect_options(db_name))
        .await?;

    // Test the connection
    sqlx::query("SELECT 1").execute(&pool).await?;

    info!(
        "✅ Connected to {}:{}/{}",
        settings.db_host, settings.db_port, db_name
    );
    Ok(pool)
}
