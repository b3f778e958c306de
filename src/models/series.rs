//! Recurring series entity.
//!
//! A series owns the ordered list of its occurrences. Events only point at
//! their series through `Event::series_id`, so every member reads the same
//! membership and there is nothing to keep in sync between siblings.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RepeatEnd {
    After { occurrences: u32 },
    On { date: NaiveDate },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepeatRule {
    pub frequency: Frequency,
    #[serde(default = "default_every")]
    pub every: u32,
    pub ends: RepeatEnd,
}

fn default_every() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct EventSeries {
    pub id: Uuid,
    pub root_event_id: Uuid,
    #[sqlx(rename = "member_ids")]
    pub members: Vec<Uuid>,
    pub rule: Json<RepeatRule>,
}

/// What happened to a series after members were removed from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// Members remain and the root is unchanged.
    Kept,
    /// The root was removed; the earliest survivor took its place.
    RootReassigned { new_root: Uuid },
    /// Nothing is left, the series itself has to go.
    Emptied,
}

impl EventSeries {
    /// Builds a series from members already in chronological order. The
    /// first member becomes the root.
    pub fn new(rule: RepeatRule, members: Vec<Uuid>) -> Option<Self> {
        let root_event_id = *members.first()?;
        Some(Self {
            id: Uuid::new_v4(),
            root_event_id,
            members,
            rule: Json(rule),
        })
    }

    pub fn is_root(&self, event_id: Uuid) -> bool {
        self.root_event_id == event_id
    }

    pub fn contains(&self, event_id: Uuid) -> bool {
        self.members.contains(&event_id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Sort members by start time. Ties keep their current relative order;
    /// members without a start date go first.
    pub fn reorder(&mut self, events: &HashMap<Uuid, Event>) {
        self.members
            .sort_by_key(|id| events.get(id).and_then(Event::start_datetime));
    }

    /// Drops `removed` from the member list and repairs the root pointer.
    ///
    /// Members must already be in chronological order, so the new root is
    /// simply the head of what is left.
    pub fn remove_members(&mut self, removed: &[Uuid]) -> Removal {
        self.members.retain(|id| !removed.contains(id));

        let Some(&head) = self.members.first() else {
            return Removal::Emptied;
        };

        if removed.contains(&self.root_event_id) {
            self.root_event_id = head;
            Removal::RootReassigned { new_root: head }
        } else {
            Removal::Kept
        }
    }
}
