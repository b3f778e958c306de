//! Development-only shortcuts: direct login, privilege escalation, user
//! listing and wiping. Every handler answers 404 unless
//! `DEVELOPMENT_MODE` is on.

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;

use super::auth::session_cookie;
use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::services::require_login;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/dev/login/{external_id}", post(dev_login))
        .route("/dev/become/{level}", post(become_level))
        .route("/dev/super", post(become_super))
        .route("/dev/users", get(view_users))
        .route("/dev/wipe", post(wipe))
}

fn development_only(state: &AppState) -> AppResult<()> {
    if state.config.is_development() {
        Ok(())
    } else {
        Err(AppError::NotFound("Not found".to_string()))
    }
}

// POST /api/dev/login/{external_id}
async fn dev_login(
    State(state): State<Arc<AppState>>,
    Path(external_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    development_only(&state)?;
    let token = state.users.login(&external_id).await?;
    let cookie = session_cookie(
        &state.config.session.cookie_name,
        &token,
        state.config.session.ttl_seconds,
    );
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "success": true, "token": token })),
    ))
}

// POST /api/dev/become/{level}
async fn become_level(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(level): Path<u8>,
) -> AppResult<impl IntoResponse> {
    development_only(&state)?;
    let me = require_login(current.user())?;
    let user = state.users.set_level(me, level).await?;
    Ok(Json(json!({ "success": true, "user": user })))
}

// POST /api/dev/super
async fn become_super(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
) -> AppResult<impl IntoResponse> {
    development_only(&state)?;
    let me = require_login(current.user())?;
    let user = state.users.set_level(me, 3).await?;
    Ok(Json(json!({ "success": true, "user": user })))
}

// GET /api/dev/users
async fn view_users(State(state): State<Arc<AppState>>) -> AppResult<impl IntoResponse> {
    development_only(&state)?;
    let users = state.users.all().await?;
    Ok(Json(json!({ "success": true, "count": users.len(), "users": users })))
}

// POST /api/dev/wipe
async fn wipe(State(state): State<Arc<AppState>>) -> AppResult<impl IntoResponse> {
    development_only(&state)?;
    let removed = state.users.wipe().await?;
    Ok(Json(json!({ "success": true, "removed": removed })))
}
