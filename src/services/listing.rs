//! Weekly grouping for the events page.
//!
//! The page shows two ISO weeks at a time, so a `week` offset of `n` moves
//! the window by `2 * n` weeks. Weeks are compared by their Monday instead of
//! `year * 52 + week`, which would alias weeks around 53-week years.

use chrono::{Datelike, Days, Duration, NaiveDate};
use serde::Serialize;

use super::series::EventService;
use crate::error::{AppError, AppResult};
use crate::models::Event;

pub const WEEKS_PER_PAGE: i64 = 2;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WeekBuckets {
    pub this_week: Vec<Event>,
    pub next_week: Vec<Event>,
}

/// Monday of the ISO week containing `date`.
pub fn iso_week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Monday of the first week shown on page `offset`, or `None` when the page
/// lies outside the calendar's date range.
fn page_start(today: NaiveDate, offset: i64) -> Option<NaiveDate> {
    let weeks = offset.checked_mul(WEEKS_PER_PAGE)?;
    iso_week_start(today).checked_add_signed(Duration::try_weeks(weeks)?)
}

/// Buckets `events` relative to `today`. Store order is kept inside each
/// bucket; events without a start date are skipped.
pub fn group_by_week(events: Vec<Event>, today: NaiveDate, offset: i64) -> AppResult<WeekBuckets> {
    let (reference, following) = page_start(today, offset)
        .and_then(|start| Some((start, start.checked_add_days(Days::new(7))?)))
        .ok_or_else(|| AppError::Validation(format!("Week offset {} is out of range", offset)))?;

    let mut buckets = WeekBuckets::default();
    for event in events {
        let Some(start) = event.start_date else {
            continue;
        };
        let week = iso_week_start(start);
        if week == reference {
            buckets.this_week.push(event);
        } else if week == following {
            buckets.next_week.push(event);
        }
    }
    Ok(buckets)
}

impl EventService {
    pub async fn list_weeks(&self, today: NaiveDate, offset: i64) -> AppResult<WeekBuckets> {
        let events = self.store.all().await?;
        group_by_week(events, today, offset)
    }
}
