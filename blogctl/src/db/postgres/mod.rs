//! PostgreSQL store.
//!
//! Queries are built at runtime with `sqlx::query_as` and mapped through private row structs.
//! Multi-statement writes (a row plus its join rows) run inside a single transaction.
//! Association ids are aggregated in SQL with `ARRAY_AGG` so a record and its join rows come
//! back in one round trip.

mod content;
mod roles;
mod users;


use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use tracing::info;

use crate::config::PoolSettings;

/// Store backed by a PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Connect to `url`, run pending migrations and return the ready store.
    pub async fn connect(url: &str, settings: &PoolSettings) -> anyhow::Result<Self> {
        let mut options = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .min_connections(settings.min_connections)
            .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs));
        if settings.idle_timeout_secs > 0 {
            options = options.idle_timeout(Duration::from_secs(settings.idle_timeout_secs));
        }
        let pool = options.connect(url).await?;

        info!("Running database migrations...");
        crate::migrator().run(&pool).await?;

        Ok(Self::new(pool))
    }
}
