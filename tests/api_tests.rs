//! Router-level tests: privileges are enforced before anything is mutated.

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use event_calendar::{config::Config, controllers, store::EventStore, AppState};

fn state() -> Arc<AppState> {
    let mut config = Config::default();
    config.features.development_mode = true;
    AppState::in_memory(config)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header("x-session-token", token);
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

/// Logs in through the dev route and registers a profile at `level`.
async fn login(app: &Router, external_id: &str, email: &str, level: u8) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        &format!("/api/dev/login/{}", external_id),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();

    let profile = json!({ "name": external_id, "email": email });
    let (status, _) = send(app, Method::POST, "/api/auth/profile", Some(&token), Some(profile)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        app,
        Method::POST,
        &format!("/api/dev/become/{}", level),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    token
}

fn weekly_event() -> Value {
    json!({
        "title": "Hack Night",
        "start_date": "2024-09-02",
        "start_time": "19:00:00",
        "repeat": {
            "frequency": "weekly",
            "every": 1,
            "ends": { "type": "after", "occurrences": 3 }
        }
    })
}

#[tokio::test]
async fn health_check() {
    let app = controllers::app(state());
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn anonymous_and_underprivileged_callers_are_rejected() {
    let state = state();
    let app = controllers::app(state.clone());

    let (status, _) = send(&app, Method::GET, "/api/events", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::POST, "/api/events", None, Some(weekly_event())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let viewer = login(&app, "viewer", "viewer@example.com", 0).await;
    let (status, body) = send(&app, Method::POST, "/api/events", Some(&viewer), Some(weekly_event())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    assert!(state.events.store().all().await.unwrap().is_empty());
}

#[tokio::test]
async fn editor_manages_a_series_end_to_end() {
    let state = state();
    let app = controllers::app(state.clone());
    let editor = login(&app, "editor", "editor@example.com", 1).await;

    let (status, body) = send(&app, Method::POST, "/api/events", Some(&editor), Some(weekly_event())).await;
    assert_eq!(status, StatusCode::CREATED);
    let events = body["events"].as_array().unwrap();
    assert_eq!(events.len(), 3);
    let root = events[0]["id"].as_str().unwrap().to_string();
    let second = events[1]["id"].as_str().unwrap().to_string();

    let (status, body) = send(&app, Method::GET, &format!("/api/events/{}", root), Some(&editor), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_root"], true);
    assert_eq!(body["series"]["members"].as_array().unwrap().len(), 3);

    let edit = json!({ "update": { "title": "Renamed" }, "scope": "following" });
    let (status, body) = send(&app, Method::PUT, &format!("/api/events/{}", second), Some(&editor), Some(edit)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"], 2);

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/events/{}/delete", root),
        Some(&editor),
        Some(json!({ "scope": "one" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["report"]["new_root"], second.as_str());

    // Editors cannot publish
    let (status, _) = send(&app, Method::POST, &format!("/api/events/{}/publish", second), Some(&editor), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    assert_eq!(state.events.store().all().await.unwrap().len(), 2);
}

#[tokio::test]
async fn invalid_ids_are_reported() {
    let state = state();
    let app = controllers::app(state.clone());
    let admin = login(&app, "admin", "admin@example.com", 3).await;

    for uri in [
        "/api/events/not-a-uuid/delete",
        "/api/events/5f1b7c1e-8d1a-4c7e-9a43-2b1f3f6f0a11/delete",
    ] {
        let (status, body) = send(&app, Method::POST, uri, Some(&admin), Some(json!({}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["message"], "Invalid event id");
    }
}

#[tokio::test]
async fn publisher_toggles_publication() {
    let state = state();
    let app = controllers::app(state.clone());
    let publisher = login(&app, "publisher", "pub@example.com", 2).await;

    let (_, body) = send(
        &app,
        Method::POST,
        "/api/events",
        Some(&publisher),
        Some(json!({ "title": "Talk", "start_date": "2024-09-03" })),
    )
    .await;
    let id = body["events"][0]["id"].as_str().unwrap().to_string();
    let uri = format!("/api/events/{}/publish", id);

    let (status, body) = send(&app, Method::POST, &uri, Some(&publisher), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Event published");
    let stamp = body["event"]["date_published"].clone();
    assert!(!stamp.is_null());

    let (_, body) = send(&app, Method::POST, &uri, Some(&publisher), None).await;
    assert_eq!(body["message"], "No changes made.");
    assert_eq!(body["event"]["date_published"], stamp);

    let (_, body) = send(&app, Method::POST, &format!("/api/events/{}/unpublish", id), Some(&publisher), None).await;
    assert_eq!(body["message"], "Event unpublished");
    assert!(body["event"]["date_published"].is_null());
}

#[tokio::test]
async fn validation_errors_do_not_create_anything() {
    let state = state();
    let app = controllers::app(state.clone());
    let editor = login(&app, "editor2", "editor2@example.com", 1).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/events",
        Some(&editor),
        Some(json!({ "title": "", "start_date": "2024-09-03" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert!(state.events.store().all().await.unwrap().is_empty());
}

#[tokio::test]
async fn logout_ends_the_session() {
    let app = controllers::app(state());
    let token = login(&app, "leaver", "leaver@example.com", 0).await;

    let (_, body) = send(&app, Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(body["logged_in"], true);

    let (status, _) = send(&app, Method::POST, "/api/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(body["logged_in"], false);
}

#[tokio::test]
async fn dev_routes_are_hidden_outside_development() {
    let app = controllers::app(AppState::in_memory(Config::default()));
    let (status, _) = send(&app, Method::POST, "/api/dev/login/someone", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_without_a_body_removes_one_occurrence() {
    let state = state();
    let app = controllers::app(state.clone());
    let editor = login(&app, "editor3", "editor3@example.com", 1).await;

    let (_, body) = send(&app, Method::POST, "/api/events", Some(&editor), Some(weekly_event())).await;
    let events = body["events"].as_array().unwrap();
    let last = events[2]["id"].as_str().unwrap().to_string();

    let (status, body) = send(&app, Method::POST, &format!("/api/events/{}/delete", last), Some(&editor), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["report"]["deleted"].as_array().unwrap().len(), 1);
    assert_eq!(state.events.store().all().await.unwrap().len(), 2);
}

#[tokio::test]
async fn huge_week_offset_is_rejected() {
    let app = controllers::app(state());
    let viewer = login(&app, "pager", "pager@example.com", 0).await;

    for week in [i64::MAX, 100_000_000] {
        let (status, body) = send(&app, Method::GET, &format!("/api/events?week={}", week), Some(&viewer), None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    let (status, _) = send(&app, Method::GET, "/api/events?week=-3", Some(&viewer), None).await;
    assert_eq!(status, StatusCode::OK);
}
