//! Recurring series mutations.
//!
//! Edits and deletes target one occurrence, the occurrence and everything
//! after it, or the whole series. Every mutation is planned against a
//! snapshot taken under the series lock and committed as one
//! [`SeriesChange`], so a failed lookup never leaves a half-updated series.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::locks::SeriesLocks;
use crate::error::{AppError, AppResult};
use crate::models::{Event, EventSeries, EventUpdate, Removal};
use crate::store::{EventStore, SeriesChange};

/// Which occurrences an edit or delete reaches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    #[default]
    One,
    Following,
    All,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeleteReport {
    pub deleted: Vec<Uuid>,
    pub new_root: Option<Uuid>,
    pub series_removed: bool,
}

#[derive(Clone)]
pub struct EventService {
    pub(crate) store: Arc<dyn EventStore>,
    pub(crate) locks: SeriesLocks,
}

impl EventService {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self {
            store,
            locks: SeriesLocks::new(),
        }
    }

    pub fn store(&self) -> &Arc<dyn EventStore> {
        &self.store
    }

    /// Looks an id up, insisting on exactly one record.
    pub async fn resolve(&self, id: Uuid) -> AppResult<Event> {
        match self.store.count_by_id(id).await? {
            0 => {
                warn!("Invalid event id {}", id);
                Err(AppError::invalid_event_id())
            }
            1 => self
                .store
                .get_by_id(id)
                .await?
                .ok_or_else(AppError::invalid_event_id),
            n => Err(AppError::Ambiguous(format!("{} matches {} events", id, n))),
        }
    }

    pub async fn get_with_series(&self, id: Uuid) -> AppResult<(Event, Option<EventSeries>)> {
        let event = self.resolve(id).await?;
        let series = match event.series_id {
            Some(series_id) => self.store.get_series(series_id).await?,
            None => None,
        };
        Ok((event, series))
    }

    /// Resolves the event and takes the lock for whatever it belongs to.
    /// The event is read again once the lock is held.
    pub(crate) async fn lock_event(
        &self,
        id: Uuid,
    ) -> AppResult<(Event, tokio::sync::OwnedMutexGuard<()>)> {
        let event = self.resolve(id).await?;
        let guard = self.locks.acquire(event.series_id.unwrap_or(event.id)).await;
        let event = self.resolve(id).await?;
        Ok((event, guard))
    }

    /// Loads the series and its members. Member ids without a record are
    /// dropped from the returned series.
    async fn load_series(&self, event: &Event) -> AppResult<Option<(EventSeries, Vec<Event>)>> {
        let Some(series_id) = event.series_id else {
            return Ok(None);
        };
        let Some(mut series) = self.store.get_series(series_id).await? else {
            warn!("Event {} points at missing series {}", event.id, series_id);
            return Ok(None);
        };

        let members = self.store.series_members(&series).await?;
        if members.len() != series.members.len() {
            warn!(
                "Series {} lists {} members but {} exist",
                series.id,
                series.members.len(),
                members.len()
            );
            series.members.retain(|id| members.iter().any(|m| m.id == *id));
            if let Some(&head) = series.members.first() {
                if !series.contains(series.root_event_id) {
                    series.root_event_id = head;
                }
            }
        }
        Ok(Some((series, members)))
    }

    pub async fn edit(&self, id: Uuid, update: &EventUpdate, scope: Scope) -> AppResult<Vec<Event>> {
        let (mut event, _guard) = self.lock_event(id).await?;
        let now = Utc::now();

        let Some((mut series, members)) = self.load_series(&event).await? else {
            update.apply(&mut event, true, now);
            ensure_ordered(&event)?;
            self.store.save(&event).await?;
            info!("Edited event {}", event.id);
            return Ok(vec![event]);
        };

        let include_dates = scope == Scope::One;
        if !include_dates && update.changes_dates() {
            return Err(AppError::Validation(
                "Dates can only be changed on a single occurrence".to_string(),
            ));
        }
        let selected = select(scope, &event, &members);

        let mut by_id: HashMap<Uuid, Event> =
            members.into_iter().map(|m| (m.id, m)).collect();
        by_id.entry(event.id).or_insert_with(|| event.clone());
        let mut changed = Vec::with_capacity(selected.len());
        let mut moved = false;
        for member_id in &selected {
            if let Some(member) = by_id.get_mut(member_id) {
                moved |= update.apply(member, include_dates, now);
                ensure_ordered(member)?;
                changed.push(member.clone());
            }
        }

        let mut change = SeriesChange {
            save_events: changed.clone(),
            ..Default::default()
        };
        if moved {
            series.reorder(&by_id);
            change.save_series.push(series);
        }
        self.store.commit(change).await?;

        info!(
            "Edited {} event(s) of series starting from {} ({:?})",
            changed.len(),
            event.id,
            scope
        );
        Ok(changed)
    }

    pub async fn delete(&self, id: Uuid, scope: Scope) -> AppResult<DeleteReport> {
        let (event, _guard) = self.lock_event(id).await?;

        let Some((mut series, members)) = self.load_series(&event).await? else {
            self.store
                .commit(SeriesChange {
                    delete_events: vec![event.id],
                    ..Default::default()
                })
                .await?;
            info!("Deleted event {}", event.id);
            return Ok(DeleteReport {
                deleted: vec![event.id],
                new_root: None,
                series_removed: false,
            });
        };

        let selected = select(scope, &event, &members);
        let mut change = SeriesChange {
            delete_events: selected.clone(),
            ..Default::default()
        };

        let outcome = series.remove_members(&selected);
        let new_root = match outcome {
            Removal::Emptied => {
                change.delete_series.push(series.id);
                None
            }
            Removal::Kept => {
                change.save_series.push(series.clone());
                None
            }
            Removal::RootReassigned { new_root } => {
                change.save_series.push(series.clone());
                Some(new_root)
            }
        };
        self.store.commit(change).await?;

        if let Some(root) = new_root {
            info!("Series {} root moved to {}", series.id, root);
        }
        info!(
            "Deleted {} event(s) from series {} ({:?})",
            selected.len(),
            series.id,
            scope
        );

        Ok(DeleteReport {
            deleted: selected,
            new_root,
            series_removed: outcome == Removal::Emptied,
        })
    }
}

fn ensure_ordered(event: &Event) -> AppResult<()> {
    if event.ends_before_start() {
        return Err(AppError::Validation(format!(
            "Event {} would end before it starts",
            event.id
        )));
    }
    Ok(())
}

/// Ids of the members `scope` reaches, in series order.
fn select(scope: Scope, target: &Event, members: &[Event]) -> Vec<Uuid> {
    match scope {
        Scope::One => vec![target.id],
        Scope::All => members.iter().map(|m| m.id).collect(),
        Scope::Following => {
            let start = target.start_datetime();
            let mut ids: Vec<Uuid> = members
                .iter()
                .filter(|m| m.start_datetime() >= start)
                .map(|m| m.id)
                .collect();
            // The target is always part of its own selection
            if !ids.contains(&target.id) {
                ids.insert(0, target.id);
            }
            ids
        }
    }
}
