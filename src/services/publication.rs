use chrono::Utc;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use super::series::EventService;
use crate::error::AppResult;
use crate::models::Event;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "event", rename_all = "snake_case")]
pub enum PublishOutcome {
    Published(Event),
    Unpublished(Event),
    /// The event already was in the requested state.
    NoChange(Event),
}

impl PublishOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            PublishOutcome::Published(_) => "Event published",
            PublishOutcome::Unpublished(_) => "Event unpublished",
            PublishOutcome::NoChange(_) => "No changes made.",
        }
    }

    pub fn event(&self) -> &Event {
        match self {
            PublishOutcome::Published(e)
            | PublishOutcome::Unpublished(e)
            | PublishOutcome::NoChange(e) => e,
        }
    }
}

impl EventService {
    pub async fn publish(&self, id: Uuid) -> AppResult<PublishOutcome> {
        self.set_published(id, true).await
    }

    pub async fn unpublish(&self, id: Uuid) -> AppResult<PublishOutcome> {
        self.set_published(id, false).await
    }

    pub async fn set_published(&self, id: Uuid, status: bool) -> AppResult<PublishOutcome> {
        let (mut event, _guard) = self.lock_event(id).await?;

        if event.published == status {
            return Ok(PublishOutcome::NoChange(event));
        }

        let now = Utc::now();
        event.published = status;
        event.date_published = status.then_some(now);
        event.updated_at = now;
        self.store.save(&event).await?;

        if status {
            info!("Published event {}", event.id);
            Ok(PublishOutcome::Published(event))
        } else {
            info!("Unpublished event {}", event.id);
            Ok(PublishOutcome::Unpublished(event))
        }
    }
}
