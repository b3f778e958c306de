use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Local;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::models::{EventUpdate, Privilege};
use crate::services::{authorize, require_login, NewEvent, Scope};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/events", get(index).post(create_event))
        .route("/events/view", get(view_events))
        .route("/events/{id}", get(get_event).put(edit_event))
        .route("/events/{id}/delete", post(delete_event))
        .route("/events/{id}/publish", post(publish_event))
        .route("/events/{id}/unpublish", post(unpublish_event))
}

/* ---------- helpers ---------- */

// Malformed ids get the same answer as unknown ones
fn parse_event_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::invalid_event_id())
}

/* ---------- LISTING ---------- */

#[derive(Debug, Deserialize)]
pub struct WeekQuery {
    pub week: Option<i64>,
}

// GET /api/events?week=N
async fn index(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Query(params): Query<WeekQuery>,
) -> AppResult<impl IntoResponse> {
    require_login(current.user())?;
    let offset = params.week.unwrap_or(0);
    let buckets = state
        .events
        .list_weeks(Local::now().date_naive(), offset)
        .await?;

    Ok(Json(json!({
        "success": true,
        "week": offset,
        "events": buckets,
    })))
}

// GET /api/events/view
async fn view_events(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
) -> AppResult<impl IntoResponse> {
    authorize(current.user(), Privilege::Edit)?;
    let events = state.events.store().all().await?;
    Ok(Json(json!({ "success": true, "count": events.len(), "events": events })))
}

/* ---------- CREATE / EDIT ---------- */

// POST /api/events
async fn create_event(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Json(form): Json<NewEvent>,
) -> AppResult<impl IntoResponse> {
    let creator = authorize(current.user(), Privilege::Edit)?;
    let events = state.events.create(&form, Some(creator)).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "series_id": events.first().and_then(|e| e.series_id),
            "events": events,
        })),
    ))
}

// GET /api/events/{id}
async fn get_event(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    authorize(current.user(), Privilege::Edit)?;
    let (event, series) = state.events.get_with_series(parse_event_id(&id)?).await?;
    let is_root = series.as_ref().is_some_and(|s| s.is_root(event.id));

    Ok(Json(json!({
        "success": true,
        "event": event,
        "is_root": is_root,
        "series": series,
    })))
}

#[derive(Debug, Deserialize)]
pub struct EditRequest {
    pub update: EventUpdate,
    #[serde(default)]
    pub scope: Scope,
}

// PUT /api/events/{id}
async fn edit_event(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<EditRequest>,
) -> AppResult<impl IntoResponse> {
    authorize(current.user(), Privilege::Edit)?;
    let id = parse_event_id(&id)?;
    req.update.validate()?;

    let events = state.events.edit(id, &req.update, req.scope).await?;
    Ok(Json(json!({
        "success": true,
        "updated": events.len(),
        "events": events,
    })))
}

/* ---------- DELETE ---------- */

#[derive(Debug, Default, Deserialize)]
pub struct DeleteRequest {
    #[serde(default)]
    pub scope: Scope,
}

// POST /api/events/{id}/delete
async fn delete_event(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(id): Path<String>,
    req: Option<Json<DeleteRequest>>,
) -> AppResult<impl IntoResponse> {
    authorize(current.user(), Privilege::Edit)?;
    // No body means a single occurrence
    let scope = req.map(|Json(req)| req.scope).unwrap_or_default();
    let report = state.events.delete(parse_event_id(&id)?, scope).await?;
    Ok(Json(json!({ "success": true, "report": report })))
}

/* ---------- PUBLICATION ---------- */

// POST /api/events/{id}/publish
async fn publish_event(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    authorize(current.user(), Privilege::Publish)?;
    let outcome = state.events.publish(parse_event_id(&id)?).await?;
    Ok(Json(json!({
        "success": true,
        "message": outcome.message(),
        "event": outcome.event(),
    })))
}

// POST /api/events/{id}/unpublish
async fn unpublish_event(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    authorize(current.user(), Privilege::Publish)?;
    let outcome = state.events.unpublish(parse_event_id(&id)?).await?;
    Ok(Json(json!({
        "success": true,
        "message": outcome.message(),
        "event": outcome.event(),
    })))
}
