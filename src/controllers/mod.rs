pub mod auth;
#[cfg(feature = "dev-routes")]
pub mod dev;
pub mod events;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    let router = Router::new().merge(events::routes()).merge(auth::routes());
    #[cfg(feature = "dev-routes")]
    let router = router.merge(dev::routes());
    router
}

/// The full application: API under `/api`, health check, tracing and CORS.
pub fn app(state: Arc<AppState>) -> Router {
    let cors = match state
        .config
        .app
        .cors_allow_origin
        .as_deref()
        .and_then(|origin| origin.parse::<axum::http::HeaderValue>().ok())
    {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(Any)
            .allow_headers(Any),
        None => CorsLayer::new(),
    };

    Router::new()
        .route("/", get(|| async { "Event Calendar API v1.0" }))
        .route("/health", get(|| async { "OK" }))
        .nest("/api", routes())
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
