use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use tracing::info;

use super::{generate_token, session_key, SessionStore};
use crate::error::AppResult;

/// Sessions in Redis, expiring on their own through `SET EX`.
#[derive(Clone)]
pub struct RedisSessionStore {
    conn: ConnectionManager,
    ttl_seconds: u64,
}

impl RedisSessionStore {
    pub async fn connect(redis_url: &str, ttl_seconds: u64) -> redis::RedisResult<Self> {
        let client = Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn, ttl_seconds })
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn create(&self, external_id: &str) -> AppResult<String> {
        let token = generate_token();
        let mut conn = self.conn.clone();
        let _: () = conn
            .set_ex(session_key(&token), external_id, self.ttl_seconds)
            .await?;
        info!("Opened session for {}", external_id);
        Ok(token)
    }

    async fn resolve(&self, token: &str) -> AppResult<Option<String>> {
        let mut conn = self.conn.clone();
        let external_id: Option<String> = conn.get(session_key(token)).await?;
        Ok(external_id)
    }

    async fn destroy(&self, token: &str) -> AppResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(session_key(token)).await?;
        info!("Closed session");
        Ok(())
    }
}
