use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub location: Option<String>,
    pub short_description: Option<String>,
    pub long_description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_date: Option<NaiveDate>,
    pub end_time: Option<NaiveTime>,
    pub is_all_day: bool,
    pub repeat: bool,
    // Owning series; the member list lives on the series itself
    pub series_id: Option<Uuid>,
    pub published: bool,
    pub date_published: Option<DateTime<Utc>>,
    pub creator_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Start of the event; midnight when only the date is known.
    pub fn start_datetime(&self) -> Option<NaiveDateTime> {
        self.start_date
            .map(|date| date.and_time(self.start_time.unwrap_or(NaiveTime::MIN)))
    }

    pub fn end_datetime(&self) -> Option<NaiveDateTime> {
        self.end_date
            .map(|date| date.and_time(self.end_time.unwrap_or(NaiveTime::MIN)))
    }

    /// Whether the end lies before the start. Events missing either date
    /// have nothing to compare.
    pub fn ends_before_start(&self) -> bool {
        matches!(
            (self.start_datetime(), self.end_datetime()),
            (Some(start), Some(end)) if end < start
        )
    }

    pub fn is_in_series(&self) -> bool {
        self.repeat && self.series_id.is_some()
    }

    /// Detach the event from any series.
    pub fn clear_series(&mut self) {
        self.repeat = false;
        self.series_id = None;
    }
}

/// Field values that an edit may change.
///
/// `None` leaves the field as it is. Dates may only be set when the edit
/// targets a single occurrence; every other field is carried to each
/// selected member of a series.
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct EventUpdate {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    #[validate(length(max = 255))]
    pub location: Option<String>,
    pub short_description: Option<String>,
    pub long_description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub is_all_day: Option<bool>,
}

impl EventUpdate {
    pub fn changes_dates(&self) -> bool {
        self.start_date.is_some() || self.end_date.is_some()
    }

    /// Apply the update. Returns `true` if the start moved, which means the
    /// series order has to be rebuilt.
    pub fn apply(&self, event: &mut Event, include_dates: bool, now: DateTime<Utc>) -> bool {
        let before = event.start_datetime();

        if let Some(title) = &self.title {
            event.title = title.clone();
        }
        if let Some(location) = &self.location {
            event.location = Some(location.clone());
        }
        if let Some(text) = &self.short_description {
            event.short_description = Some(text.clone());
        }
        if let Some(text) = &self.long_description {
            event.long_description = Some(text.clone());
        }
        if let Some(time) = self.start_time {
            event.start_time = Some(time);
        }
        if let Some(time) = self.end_time {
            event.end_time = Some(time);
        }
        if let Some(all_day) = self.is_all_day {
            event.is_all_day = all_day;
        }
        if include_dates {
            if let Some(date) = self.start_date {
                event.start_date = Some(date);
            }
            if let Some(date) = self.end_date {
                event.end_date = Some(date);
            }
        }

        event.updated_at = now;
        before != event.start_datetime()
    }
}

#[cfg(test)]
pub(crate) fn sample_event(start_date: Option<NaiveDate>) -> Event {
    let now = Utc::now();
    Event {
        id: Uuid::new_v4(),
        title: "Hack Night".to_string(),
        location: Some("Lerner 555".to_string()),
        short_description: None,
        long_description: None,
        start_date,
        start_time: NaiveTime::from_hms_opt(19, 0, 0),
        end_date: start_date,
        end_time: NaiveTime::from_hms_opt(22, 0, 0),
        is_all_day: false,
        repeat: false,
        series_id: None,
        published: false,
        date_published: None,
        creator_id: None,
        created_at: now,
        updated_at: now,
    }
}
