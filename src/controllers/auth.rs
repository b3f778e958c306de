use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::middleware::{CurrentUser, SessionToken};
use crate::services::require_login;
use crate::services::users::{AddUserForm, ProfileForm};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/me", get(me))
        .route("/auth/profile", post(create_profile))
        .route("/auth/logout", post(logout))
        .route("/users", post(add_user))
        .route("/users/{email}", delete(remove_user))
}

/// `Set-Cookie` value that expires the session cookie.
pub(crate) fn clear_cookie(name: &str) -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", name)
}

pub(crate) fn session_cookie(name: &str, token: &str, ttl_seconds: u64) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        name, token, ttl_seconds
    )
}

// GET /api/auth/me
async fn me(current: CurrentUser) -> impl IntoResponse {
    Json(json!({
        "success": true,
        "logged_in": current.user.is_some(),
        "user": current.user,
    }))
}

// POST /api/auth/profile
async fn create_profile(
    State(state): State<Arc<AppState>>,
    SessionToken(token): SessionToken,
    Json(form): Json<ProfileForm>,
) -> AppResult<impl IntoResponse> {
    let token = token.ok_or(AppError::Unauthorized)?;
    let (user, outcome) = state.users.create_profile(&token, &form).await?;
    Ok(Json(json!({
        "success": true,
        "message": outcome.message(),
        "user": user,
    })))
}

// POST /api/auth/logout
async fn logout(
    State(state): State<Arc<AppState>>,
    SessionToken(token): SessionToken,
) -> AppResult<impl IntoResponse> {
    if let Some(token) = token {
        state.users.logout(&token).await?;
    }
    Ok((
        [(header::SET_COOKIE, clear_cookie(&state.config.session.cookie_name))],
        Json(json!({ "success": true, "message": "You were signed out" })),
    ))
}

// POST /api/users
async fn add_user(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Json(form): Json<AddUserForm>,
) -> AppResult<impl IntoResponse> {
    require_login(current.user())?;
    let user = state.users.add_user(&form).await?;
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "user": user }))))
}

// DELETE /api/users/{email}
async fn remove_user(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(email): Path<String>,
) -> AppResult<impl IntoResponse> {
    let me = require_login(current.user())?;
    let token = current.token.as_deref().unwrap_or_default();
    let logged_out = state.users.remove_user(&email, me, token).await?;

    let body = Json(json!({ "success": true, "logged_out": logged_out }));
    if logged_out {
        let cookie = clear_cookie(&state.config.session.cookie_name);
        Ok(([(header::SET_COOKIE, cookie)], body).into_response())
    } else {
        Ok(body.into_response())
    }
}
