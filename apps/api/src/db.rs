use std::time::Duration;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, warn};

/// Creates a lazily-connecting PostgreSQL pool.
///
/// No connection is opened here, so the service starts even when the database
/// is down; analytics endpoints then serve their fallback payloads.
pub fn create_pool(database_url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect_lazy(database_url)?;

    info!("PostgreSQL connection pool configured (lazy)");
    Ok(pool)
}

/// Applies pending migrations. Failure is logged, not fatal.
pub async fn run_migrations(pool: &PgPool) {
    match sqlx::migrate!("./migrations").run(pool).await {
        Ok(()) => info!("Database migrations applied"),
        Err(e) => warn!("Could not apply migrations, continuing without them: {e}"),
    }
}
