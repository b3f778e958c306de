use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use super::{EventStore, SeriesChange, UserStore};
use crate::error::{AppError, AppResult};
use crate::models::{Event, EventSeries, User};

#[derive(Default)]
struct EventTables {
    // Vec keeps insertion order, which the weekly listing relies on
    events: Vec<Event>,
    series: HashMap<Uuid, EventSeries>,
}

impl EventTables {
    fn upsert(&mut self, event: Event) {
        match self.events.iter_mut().find(|e| e.id == event.id) {
            Some(slot) => *slot = event,
            None => self.events.push(event),
        }
    }
}

/// In-process event store.
#[derive(Default)]
pub struct MemoryEventStore {
    tables: RwLock<EventTables>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> AppResult<RwLockReadGuard<'_, EventTables>> {
        self.tables
            .read()
            .map_err(|_| AppError::Internal("event store lock poisoned".to_string()))
    }

    fn write(&self) -> AppResult<RwLockWriteGuard<'_, EventTables>> {
        self.tables
            .write()
            .map_err(|_| AppError::Internal("event store lock poisoned".to_string()))
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Event>> {
        Ok(self.read()?.events.iter().find(|e| e.id == id).cloned())
    }

    async fn count_by_id(&self, id: Uuid) -> AppResult<i64> {
        Ok(self.read()?.events.iter().filter(|e| e.id == id).count() as i64)
    }

    async fn save(&self, event: &Event) -> AppResult<()> {
        self.write()?.upsert(event.clone());
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.write()?.events.retain(|e| e.id != id);
        Ok(())
    }

    async fn all(&self) -> AppResult<Vec<Event>> {
        Ok(self.read()?.events.clone())
    }

    async fn get_series(&self, id: Uuid) -> AppResult<Option<EventSeries>> {
        Ok(self.read()?.series.get(&id).cloned())
    }

    async fn commit(&self, change: SeriesChange) -> AppResult<()> {
        // One write guard for the whole batch
        let mut tables = self.write()?;

        for series in change.save_series {
            tables.series.insert(series.id, series);
        }
        for event in change.save_events {
            tables.upsert(event);
        }
        tables
            .events
            .retain(|e| !change.delete_events.contains(&e.id));
        for id in &change.delete_series {
            tables.series.remove(id);
        }

        Ok(())
    }
}

/// In-process user store.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<Vec<User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> AppResult<RwLockReadGuard<'_, Vec<User>>> {
        self.users
            .read()
            .map_err(|_| AppError::Internal("user store lock poisoned".to_string()))
    }

    fn write(&self) -> AppResult<RwLockWriteGuard<'_, Vec<User>>> {
        self.users
            .write()
            .map_err(|_| AppError::Internal("user store lock poisoned".to_string()))
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.read()?.iter().find(|u| u.id == id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(self.read()?.iter().find(|u| u.email == email).cloned())
    }

    async fn get_by_external_id(&self, external_id: &str) -> AppResult<Option<User>> {
        Ok(self
            .read()?
            .iter()
            .find(|u| u.external_id.as_deref() == Some(external_id))
            .cloned())
    }

    async fn save(&self, user: &User) -> AppResult<()> {
        let mut users = self.write()?;
        let others = users.iter().filter(|u| u.id != user.id);
        for other in others {
            if other.email == user.email {
                return Err(AppError::Validation(format!(
                    "email {} is already registered",
                    user.email
                )));
            }
            if user.external_id.is_some() && other.external_id == user.external_id {
                return Err(AppError::Validation(
                    "login is already linked to another account".to_string(),
                ));
            }
        }
        match users.iter_mut().find(|u| u.id == user.id) {
            Some(slot) => *slot = user.clone(),
            None => users.push(user.clone()),
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.write()?.retain(|u| u.id != id);
        Ok(())
    }

    async fn all(&self) -> AppResult<Vec<User>> {
        Ok(self.read()?.clone())
    }

    async fn delete_all(&self) -> AppResult<u64> {
        let mut users = self.write()?;
        let removed = users.len() as u64;
        users.clear();
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::event::sample_event;
    use crate::models::{Frequency, RepeatEnd, RepeatRule};
    use chrono::NaiveDate;

    #[tokio::test]
    async fn save_is_an_upsert_that_keeps_position() {
        let store = MemoryEventStore::new();
        let mut first = sample_event(NaiveDate::from_ymd_opt(2024, 1, 1));
        let second = sample_event(NaiveDate::from_ymd_opt(2024, 1, 2));
        store.save(&first).await.unwrap();
        store.save(&second).await.unwrap();

        first.title = "Changed".to_string();
        store.save(&first).await.unwrap();

        let all = store.all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].title, "Changed");
        assert_eq!(store.count_by_id(first.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn commit_applies_every_part() {
        let store = MemoryEventStore::new();
        let a = sample_event(NaiveDate::from_ymd_opt(2024, 1, 1));
        let b = sample_event(NaiveDate::from_ymd_opt(2024, 1, 8));
        let rule = RepeatRule {
            frequency: Frequency::Weekly,
            every: 1,
            ends: RepeatEnd::After { occurrences: 2 },
        };
        let series = EventSeries::new(rule, vec![a.id, b.id]).unwrap();

        store
            .commit(SeriesChange {
                save_events: vec![a.clone(), b.clone()],
                save_series: vec![series.clone()],
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(store.series_members(&series).await.unwrap().len(), 2);

        store
            .commit(SeriesChange {
                delete_events: vec![a.id, b.id],
                delete_series: vec![series.id],
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(store.all().await.unwrap().is_empty());
        assert!(store.get_series(series.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = MemoryUserStore::new();
        store.save(&User::new("A", "a@example.com")).await.unwrap();
        let err = store.save(&User::new("B", "a@example.com")).await;
        assert!(matches!(err, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn external_id_is_unique() {
        let store = MemoryUserStore::new();
        let mut first = User::new("A", "a@example.com");
        first.external_id = Some("sso-1".to_string());
        store.save(&first).await.unwrap();

        let mut second = User::new("B", "b@example.com");
        second.external_id = Some("sso-1".to_string());
        let err = store.save(&second).await;
        assert!(matches!(err, Err(AppError::Validation(_))));

        // Users without a login yet do not collide with each other
        store.save(&User::new("C", "c@example.com")).await.unwrap();
        store.save(&User::new("D", "d@example.com")).await.unwrap();
        assert_eq!(store.all().await.unwrap().len(), 3);
    }
}
