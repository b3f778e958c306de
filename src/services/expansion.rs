//! Turning a creation request into one event or a whole series.

use chrono::{Duration, Months, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::series::EventService;
use crate::error::AppResult;
use crate::models::{Event, EventSeries, Frequency, RepeatEnd, RepeatRule, User};
use crate::store::SeriesChange;

pub const MAX_OCCURRENCES: usize = 365;

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[validate(schema(function = "validate_new_event"))]
pub struct NewEvent {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(length(max = 255))]
    pub location: Option<String>,
    #[validate(length(max = 512))]
    pub short_description: Option<String>,
    pub long_description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_date: Option<NaiveDate>,
    pub end_time: Option<NaiveTime>,
    #[serde(default)]
    pub is_all_day: bool,
    pub repeat: Option<RepeatRule>,
}

fn validate_new_event(form: &NewEvent) -> Result<(), ValidationError> {
    if let (Some(start), Some(end)) = (form.start_date, form.end_date) {
        let start = start.and_time(form.start_time.unwrap_or(NaiveTime::MIN));
        let end = end.and_time(form.end_time.unwrap_or(NaiveTime::MIN));
        if end < start {
            return Err(ValidationError::new("end_before_start"));
        }
    }

    if let Some(rule) = &form.repeat {
        let Some(start) = form.start_date else {
            return Err(ValidationError::new("repeat_without_start_date"));
        };
        if rule.every == 0 {
            return Err(ValidationError::new("repeat_every_zero"));
        }
        match rule.ends {
            RepeatEnd::After { occurrences: 0 } => {
                return Err(ValidationError::new("repeat_no_occurrences"));
            }
            RepeatEnd::On { date } if date < start => {
                return Err(ValidationError::new("repeat_ends_before_start"));
            }
            _ => {}
        }
    }

    Ok(())
}

/// Occurrence start dates for `rule`, first one included.
pub fn occurrence_dates(start: NaiveDate, rule: &RepeatRule) -> Vec<NaiveDate> {
    let limit = match rule.ends {
        RepeatEnd::After { occurrences } => (occurrences as usize).min(MAX_OCCURRENCES),
        RepeatEnd::On { .. } => MAX_OCCURRENCES,
    };

    let mut dates = Vec::new();
    for step in 0..limit as u32 {
        let offset = step.saturating_mul(rule.every.max(1));
        let date = match rule.frequency {
            Frequency::Daily => start.checked_add_signed(Duration::days(offset as i64)),
            Frequency::Weekly => start.checked_add_signed(Duration::weeks(offset as i64)),
            Frequency::Monthly => start.checked_add_months(Months::new(offset)),
        };
        let Some(date) = date else { break };
        if let RepeatEnd::On { date: last } = rule.ends {
            if date > last {
                break;
            }
        }
        dates.push(date);
    }
    dates
}

impl NewEvent {
    fn build(&self, start_date: Option<NaiveDate>, creator: Option<&User>) -> Event {
        let now = Utc::now();
        // Keep the event's length when it is moved to another occurrence
        let end_date = match (self.start_date, self.end_date, start_date) {
            (Some(orig_start), Some(orig_end), Some(start)) => Some(start + (orig_end - orig_start)),
            _ => self.end_date,
        };

        Event {
            id: Uuid::new_v4(),
            title: self.title.clone(),
            location: self.location.clone(),
            short_description: self.short_description.clone(),
            long_description: self.long_description.clone(),
            start_date,
            start_time: self.start_time,
            end_date,
            end_time: self.end_time,
            is_all_day: self.is_all_day,
            repeat: false,
            series_id: None,
            published: false,
            date_published: None,
            creator_id: creator.map(|u| u.id),
            created_at: now,
            updated_at: now,
        }
    }
}

impl EventService {
    /// Creates the event, or every occurrence of it when a repeat rule is
    /// given. Occurrences come back in chronological order, root first.
    pub async fn create(&self, form: &NewEvent, creator: Option<&User>) -> AppResult<Vec<Event>> {
        form.validate()?;

        let (rule, start) = match (form.repeat, form.start_date) {
            (Some(rule), Some(start)) => (rule, start),
            _ => {
                let event = form.build(form.start_date, creator);
                self.store
                    .commit(SeriesChange {
                        save_events: vec![event.clone()],
                        ..Default::default()
                    })
                    .await?;
                info!("Created event {}", event.id);
                return Ok(vec![event]);
            }
        };

        let mut events: Vec<Event> = occurrence_dates(start, &rule)
            .into_iter()
            .map(|date| form.build(Some(date), creator))
            .collect();

        let ids = events.iter().map(|e| e.id).collect();
        let Some(series) = EventSeries::new(rule, ids) else {
            return Ok(Vec::new());
        };
        for event in &mut events {
            event.repeat = true;
            event.series_id = Some(series.id);
        }

        let _guard = self.locks.acquire(series.id).await;
        self.store
            .commit(SeriesChange {
                save_events: events.clone(),
                save_series: vec![series.clone()],
                ..Default::default()
            })
            .await?;

        info!(
            "Created series {} with {} occurrences, root {}",
            series.id,
            events.len(),
            series.root_event_id
        );
        Ok(events)
    }
}
