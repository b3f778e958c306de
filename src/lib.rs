pub mod cache;
pub mod config;
pub mod controllers;
pub mod error;
pub mod middleware;
pub mod models;
pub mod services;
pub mod store;

use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use cache::{MemorySessionStore, RedisSessionStore};
use services::{EventService, UserService};
use store::{MemoryEventStore, MemoryUserStore, PgEventStore, PgUserStore};

// Shared state for the whole application
#[derive(Clone)]
pub struct AppState {
    pub events: EventService,
    pub users: UserService,
    pub config: config::Config,
}

impl AppState {
    /// Connects to Postgres and Redis and runs pending migrations.
    pub async fn new(config: config::Config) -> anyhow::Result<Arc<Self>> {
        let pool = store::postgres::connect(&config.database.url, config.database.pool_size).await?;
        info!("Database connected");
        store::postgres::run_migrations(&pool).await?;

        let sessions =
            RedisSessionStore::connect(&config.redis.url, config.session.ttl_seconds).await?;
        info!("Redis connected");

        Ok(Arc::new(Self {
            events: EventService::new(Arc::new(PgEventStore::new(pool.clone()))),
            users: UserService::new(Arc::new(PgUserStore::new(pool)), Arc::new(sessions)),
            config,
        }))
    }

    /// Everything in process memory; nothing survives a restart.
    pub fn in_memory(config: config::Config) -> Arc<Self> {
        let ttl = Duration::from_secs(config.session.ttl_seconds);
        Arc::new(Self {
            events: EventService::new(Arc::new(MemoryEventStore::new())),
            users: UserService::new(
                Arc::new(MemoryUserStore::new()),
                Arc::new(MemorySessionStore::new(ttl)),
            ),
            config,
        })
    }
}
