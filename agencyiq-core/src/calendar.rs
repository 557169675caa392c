//! 30-day content calendar, always laid out in the business timezone.
//!
//! Posts and "today" are projected into Australia/Brisbane before their dates
//! are compared, so a viewer's own timezone never moves a post onto another
//! day. The builder is pure: same inputs, same calendar.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Days, NaiveDate, TimeZone, Weekday};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::debug;

use crate::contract::LocalEvent;
use crate::post::Post;

/// Fixed business timezone (UTC+10, no daylight saving).
pub const BUSINESS_TIMEZONE: Tz = chrono_tz::Australia::Brisbane;

pub const CALENDAR_WINDOW_DAYS: u32 = 30;

/// Date component of `instant` in the business timezone.
pub fn business_date<T: TimeZone>(instant: &DateTime<T>) -> NaiveDate {
    instant.with_timezone(&BUSINESS_TIMEZONE).date_naive()
}

/// `instant` expressed in the business timezone.
pub fn business_time<T: TimeZone>(instant: &DateTime<T>) -> DateTime<Tz> {
    instant.with_timezone(&BUSINESS_TIMEZONE)
}

/// Tuesday to Thursday (B2B) plus the weekend (consumer) are optimal;
/// Monday and Friday are not.
pub fn is_optimal_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Mon | Weekday::Fri)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub posts: Vec<Post>,
    pub local_events: Vec<String>,
    pub is_optimal_day: bool,
}

impl CalendarDay {
    /// `YYYY-MM-DD` label of the day.
    pub fn date_key(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}

/// Local events keyed by `MM-DD` (every year) or `YYYY-MM-DD` (once).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventCatalog {
    events: Vec<LocalEvent>,
}

impl EventCatalog {
    /// Keeps well-formed keys in catalog order and drops the rest.
    pub fn new(events: Vec<LocalEvent>) -> Self {
        let events = events
            .into_iter()
            .filter(|event| {
                let valid = is_valid_key(&event.date_key);
                if !valid {
                    debug!(date_key = %event.date_key, name = %event.name, "Ignoring malformed event key");
                }
                valid
            })
            .collect();
        Self { events }
    }

    /// Fixed-date observances for Queensland audiences.
    pub fn queensland_defaults() -> Self {
        let fixed = [
            ("01-01", "New Year's Day"),
            ("01-26", "Australia Day"),
            ("02-14", "Valentine's Day"),
            ("04-25", "Anzac Day"),
            ("06-06", "Queensland Day"),
            ("12-24", "Christmas Eve"),
            ("12-25", "Christmas Day"),
            ("12-26", "Boxing Day"),
            ("12-31", "New Year's Eve"),
        ];
        Self::new(
            fixed
                .iter()
                .map(|(key, name)| LocalEvent {
                    date_key: (*key).to_string(),
                    name: (*name).to_string(),
                })
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Names of events active on `date`, in catalog order.
    pub fn events_on(&self, date: NaiveDate) -> Vec<String> {
        let recurring = date.format("%m-%d").to_string();
        let one_off = date.format("%Y-%m-%d").to_string();
        self.events
            .iter()
            .filter(|event| event.date_key == recurring || event.date_key == one_off)
            .map(|event| event.name.clone())
            .collect()
    }
}

fn is_valid_key(key: &str) -> bool {
    match key.len() {
        // 2000 is a leap year, so 02-29 stays valid.
        5 => NaiveDate::parse_from_str(&format!("2000-{key}"), "%Y-%m-%d").is_ok(),
        10 => NaiveDate::parse_from_str(key, "%Y-%m-%d").is_ok(),
        _ => false,
    }
}

/// Builds `window_days` consecutive days starting at "today" in the business
/// timezone. Posts outside the window are left out; posts within a day keep
/// their arrival order.
pub fn build_calendar<T: TimeZone>(
    reference: &DateTime<T>,
    posts: &[Post],
    catalog: &EventCatalog,
    window_days: u32,
) -> Vec<CalendarDay> {
    let today = business_date(reference);

    let mut by_date: HashMap<NaiveDate, Vec<Post>> = HashMap::new();
    for post in posts {
        by_date
            .entry(business_date(&post.scheduled_for))
            .or_default()
            .push(post.clone());
    }

    (0..window_days)
        .filter_map(|offset| today.checked_add_days(Days::new(u64::from(offset))))
        .map(|date| CalendarDay {
            date,
            posts: by_date.remove(&date).unwrap_or_default(),
            local_events: catalog.events_on(date),
            is_optimal_day: is_optimal_day(date),
        })
        .collect()
}
