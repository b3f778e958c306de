use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use std::sync::Arc;

use crate::error::AppError;
use crate::models::User;
use crate::AppState;

pub const SESSION_HEADER: &str = "x-session-token";

/// Session token sent by the client, from the session cookie or the
/// `X-Session-Token` header.
#[derive(Debug, Clone)]
pub struct SessionToken(pub Option<String>);

/// The logged-in user, or `None` for anonymous visitors.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: Option<User>,
    pub token: Option<String>,
}

impl CurrentUser {
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }
}

pub fn token_from_headers(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    if let Some(token) = headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
    {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == cookie_name)
        .map(|(_, value)| value.to_string())
        .filter(|v| !v.is_empty())
}

impl FromRequestParts<Arc<AppState>> for SessionToken {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        Ok(SessionToken(token_from_headers(
            &parts.headers,
            &state.config.session.cookie_name,
        )))
    }
}

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let SessionToken(token) = SessionToken::from_request_parts(parts, state).await?;
        let user = state.users.resolve_current_user(token.as_deref()).await?;
        Ok(CurrentUser { user, token })
    }
}
