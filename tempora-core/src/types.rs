//! Core domain types for tempora
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Event** | A timestamped block of a user's time, labelled with a category |
//! | **Category** | The `event_type` label (`work`, `personal`, `health`, `learning`, `other`, ...) |
//! | **Productive category** | One of [`PRODUCTIVE_CATEGORIES`]; only the trend view uses this set |
//! | **Window** | A closed `[start, end]` interval matched against an event's `start_time` |
//! | **Aggregate row** | One computed summary record; never persisted |
//!
//! Categories are open-ended strings. Only the two fixed lists below give
//! particular labels a meaning, and the two lists intentionally differ.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Categories counted as productive time in the daily trend.
pub const PRODUCTIVE_CATEGORIES: [&str; 3] = ["work", "health", "learning"];

/// Categories reported by category efficiency, in output order.
///
/// Not the same set as [`PRODUCTIVE_CATEGORIES`]: `learning` is absent and
/// `personal`/`other` are present.
pub const EFFICIENCY_CATEGORIES: [&str; 4] = ["work", "personal", "health", "other"];

/// The only category that feeds the peak hours profile.
pub const PEAK_HOURS_CATEGORY: &str = "work";

const MICROS_PER_HOUR: f64 = 3_600_000_000.0;

/// Convert a duration to fractional hours.
pub fn duration_hours(delta: Duration) -> f64 {
    match delta.num_microseconds() {
        Some(us) => us as f64 / MICROS_PER_HOUR,
        None => delta.num_seconds() as f64 / 3600.0,
    }
}

/// Round to two decimal places, ties to even (0.125 -> 0.12).
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

// ============================================
// Events
// ============================================

/// Recurrence label carried on an event. Aggregation ignores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Repeat {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Repeat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Repeat::Daily => "daily",
            Repeat::Weekly => "weekly",
            Repeat::Monthly => "monthly",
            Repeat::Yearly => "yearly",
        }
    }
}

impl std::str::FromStr for Repeat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Repeat::Daily),
            "weekly" => Ok(Repeat::Weekly),
            "monthly" => Ok(Repeat::Monthly),
            "yearly" => Ok(Repeat::Yearly),
            _ => Err(format!("unknown repeat: {}", s)),
        }
    }
}

fn new_event_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// A block of time on a user's calendar.
///
/// `start_time` and `end_time` are optional because stored records are not
/// guaranteed to be complete. See [`Event::duration_hours`] for how such
/// records are counted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Unique identifier
    #[serde(default = "new_event_id")]
    pub id: String,
    /// Owner of the event
    pub user_id: String,
    /// Short label shown on calendars
    #[serde(default)]
    pub title: String,
    /// Free-form notes
    #[serde(default)]
    pub description: Option<String>,
    /// When the event begins
    pub start_time: Option<DateTime<Utc>>,
    /// When the event ends
    pub end_time: Option<DateTime<Utc>>,
    /// Category label
    pub event_type: String,
    /// Recurrence, if any
    #[serde(default)]
    pub repeat: Option<Repeat>,
}

impl Event {
    /// Create an event with a fresh id and no title.
    pub fn new(
        user_id: impl Into<String>,
        event_type: impl Into<String>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: new_event_id(),
            user_id: user_id.into(),
            title: String::new(),
            description: None,
            start_time: Some(start_time),
            end_time: Some(end_time),
            event_type: event_type.into(),
            repeat: None,
        }
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// True when either bound is missing or the event ends before it starts.
    pub fn is_malformed(&self) -> bool {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => end < start,
            _ => true,
        }
    }

    /// Elapsed time, or `None` for a malformed event.
    pub fn duration(&self) -> Option<Duration> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) if end >= start => Some(end - start),
            _ => None,
        }
    }

    /// Elapsed time in hours. Malformed events count as zero hours.
    pub fn duration_hours(&self) -> f64 {
        match self.duration() {
            Some(delta) => duration_hours(delta),
            None => {
                tracing::debug!(event_id = %self.id, "Malformed event counted as zero hours");
                0.0
            }
        }
    }
}

// ============================================
// Aggregate rows
// ============================================

/// Hours spent per category over a window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionRow {
    pub category: String,
    pub total_hours: f64,
    pub event_count: i64,
}

/// Productive hours on one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub productive_hours: f64,
    /// Full weekday name, e.g. "Monday"
    pub day_name: String,
}

/// Work hours attributed to one hour of the day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeakHourBucket {
    /// Hour of day, 0-23
    pub hour: u8,
    pub hours: f64,
}

impl PeakHourBucket {
    /// Label such as "09:00".
    pub fn label(&self) -> String {
        format!("{:02}:00", self.hour)
    }
}

/// Average event length for a category, across all time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyRow {
    pub category: String,
    pub avg_duration_hours: f64,
    pub total_events: i64,
}
