//! Login sessions.
//!
//! A session maps an opaque token handed to the browser to the subject id
//! the SSO provider vouched for. Only a hash of the token is ever stored.

pub mod auth;

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

pub use auth::RedisSessionStore;

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Opens a session for `external_id` and returns its token.
    async fn create(&self, external_id: &str) -> AppResult<String>;

    /// Subject id behind `token`, if the session is still alive.
    async fn resolve(&self, token: &str) -> AppResult<Option<String>>;

    async fn destroy(&self, token: &str) -> AppResult<()>;
}

/// 32 random bytes, URL-safe.
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    bytes[..16].copy_from_slice(Uuid::new_v4().as_bytes());
    bytes[16..].copy_from_slice(Uuid::new_v4().as_bytes());
    URL_SAFE_NO_PAD.encode(bytes)
}

pub fn session_key(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    format!("session:{}", URL_SAFE_NO_PAD.encode(digest))
}

/// Session store kept in process memory, for tests and single-node dev runs.
pub struct MemorySessionStore {
    ttl: Duration,
    sessions: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn sessions(&self) -> AppResult<std::sync::MutexGuard<'_, HashMap<String, (String, Instant)>>> {
        self.sessions
            .lock()
            .map_err(|_| AppError::Internal("session store lock poisoned".to_string()))
    }

    /// Number of sessions currently held, expired ones included.
    pub fn session_count(&self) -> AppResult<usize> {
        Ok(self.sessions()?.len())
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, external_id: &str) -> AppResult<String> {
        let token = generate_token();
        let now = Instant::now();
        let mut sessions = self.sessions()?;
        sessions.retain(|_, (_, expires)| *expires > now);
        sessions.insert(session_key(&token), (external_id.to_string(), now + self.ttl));
        Ok(token)
    }

    async fn resolve(&self, token: &str) -> AppResult<Option<String>> {
        let mut sessions = self.sessions()?;
        let key = session_key(token);
        match sessions.get(&key) {
            Some((external_id, expires)) if *expires > Instant::now() => {
                Ok(Some(external_id.clone()))
            }
            Some(_) => {
                sessions.remove(&key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn destroy(&self, token: &str) -> AppResult<()> {
        self.sessions()?.remove(&session_key(token));
        Ok(())
    }
}
