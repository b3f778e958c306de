//! Persistence boundary for events, series and users.
//!
//! The series logic only talks to these traits. `postgres` is what the
//! server runs on; `memory` backs the tests and local tinkering.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{Event, EventSeries, User};

pub use memory::{MemoryEventStore, MemoryUserStore};
pub use postgres::{PgEventStore, PgUserStore};

/// A batch of writes that must land together.
#[derive(Debug, Default, Clone)]
pub struct SeriesChange {
    pub save_events: Vec<Event>,
    pub delete_events: Vec<Uuid>,
    pub save_series: Vec<EventSeries>,
    pub delete_series: Vec<Uuid>,
}

impl SeriesChange {
    pub fn is_empty(&self) -> bool {
        self.save_events.is_empty()
            && self.delete_events.is_empty()
            && self.save_series.is_empty()
            && self.delete_series.is_empty()
    }
}

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Event>>;

    async fn count_by_id(&self, id: Uuid) -> AppResult<i64>;

    /// Insert or replace.
    async fn save(&self, event: &Event) -> AppResult<()>;

    async fn delete(&self, id: Uuid) -> AppResult<()>;

    /// Every event, in insertion order.
    async fn all(&self) -> AppResult<Vec<Event>>;

    async fn get_series(&self, id: Uuid) -> AppResult<Option<EventSeries>>;

    /// Applies the whole change or none of it.
    async fn commit(&self, change: SeriesChange) -> AppResult<()>;

    /// Members of a series in series order. Ids with no record are skipped.
    async fn series_members(&self, series: &EventSeries) -> AppResult<Vec<Event>> {
        let mut members = Vec::with_capacity(series.members.len());
        for id in &series.members {
            if let Some(event) = self.get_by_id(*id).await? {
                members.push(event);
            }
        }
        Ok(members)
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    async fn get_by_email(&self, email: &str) -> AppResult<Option<User>>;

    async fn get_by_external_id(&self, external_id: &str) -> AppResult<Option<User>>;

    async fn save(&self, user: &User) -> AppResult<()>;

    async fn delete(&self, id: Uuid) -> AppResult<()>;

    async fn all(&self) -> AppResult<Vec<User>>;

    async fn delete_all(&self) -> AppResult<u64>;
}
