//! Window resolution
//!
//! Turns logical range requests ("the last 30 days", "March 2024") into
//! concrete closed `[start, end]` windows in UTC. Calendar boundaries are
//! computed in a caller-supplied fixed offset so that "a day" means the
//! user's day rather than the UTC day.

use crate::error::{Error, Result};
use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

/// A closed interval of instants, inclusive at both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// `[reference - days, reference]`.
    ///
    /// The start saturates at the earliest representable instant.
    pub fn trailing_days(reference: DateTime<Utc>, days: u32) -> Self {
        Self {
            start: reference
                .checked_sub_signed(Duration::days(i64::from(days)))
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
            end: reference,
        }
    }

    /// Midnight through the last instant of `date`, in `offset` local time.
    pub fn day(date: NaiveDate, offset: FixedOffset) -> Self {
        let start = local_midnight(date, offset);
        let end = start
            .checked_add_signed(Duration::days(1) - Duration::microseconds(1))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self { start, end }
    }

    /// Whether `instant` falls inside the window.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }
}

/// The UTC instant of local midnight at the start of `date`.
fn local_midnight(date: NaiveDate, offset: FixedOffset) -> DateTime<Utc> {
    let local = date.and_time(NaiveTime::MIN);
    match local.checked_sub_signed(Duration::seconds(i64::from(offset.local_minus_utc()))) {
        Some(utc) => utc.and_utc(),
        None if offset.local_minus_utc() > 0 => DateTime::<Utc>::MIN_UTC,
        None => DateTime::<Utc>::MAX_UTC,
    }
}

/// Calendar date of `instant` as seen from `offset`.
pub fn local_date(instant: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    instant.with_timezone(&offset).date_naive()
}

/// A named calendar period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarPeriod {
    /// A single day
    Day(NaiveDate),
    /// The Monday-to-Sunday week containing the date
    Week(NaiveDate),
    /// Specific month (year, month 1-12)
    Month(i32, u32),
    /// Full year
    Year(i32),
}

impl CalendarPeriod {
    /// First calendar day in the period.
    pub fn first_day(&self) -> Result<NaiveDate> {
        match *self {
            CalendarPeriod::Day(date) => Ok(date),
            CalendarPeriod::Week(date) => {
                let back = i64::from(date.weekday().num_days_from_monday());
                date.checked_sub_signed(Duration::days(back))
                    .ok_or_else(|| Error::InvalidWindow(format!("no week before {}", date)))
            }
            CalendarPeriod::Month(year, month) => ymd(year, month, 1),
            CalendarPeriod::Year(year) => ymd(year, 1, 1),
        }
    }

    /// Last calendar day in the period.
    pub fn last_day(&self) -> Result<NaiveDate> {
        match *self {
            CalendarPeriod::Day(date) => Ok(date),
            CalendarPeriod::Week(_) => {
                let monday = self.first_day()?;
                monday
                    .checked_add_signed(Duration::days(6))
                    .ok_or_else(|| Error::InvalidWindow(format!("no week after {}", monday)))
            }
            CalendarPeriod::Month(year, month) => {
                let (next_year, next_month) = if month == 12 {
                    (year + 1, 1)
                } else {
                    (year, month + 1)
                };
                // Validate the requested month itself before rolling over.
                ymd(year, month, 1)?;
                ymd(next_year, next_month, 1)?
                    .pred_opt()
                    .ok_or_else(|| Error::InvalidWindow(format!("{}-{:02}", year, month)))
            }
            CalendarPeriod::Year(year) => ymd(year, 12, 31),
        }
    }

    /// Number of calendar days covered.
    pub fn num_days(&self) -> Result<i64> {
        Ok((self.last_day()? - self.first_day()?).num_days() + 1)
    }

    /// Resolve to a closed window in `offset` local time.
    pub fn window(&self, offset: FixedOffset) -> Result<TimeWindow> {
        let first = TimeWindow::day(self.first_day()?, offset);
        let last = TimeWindow::day(self.last_day()?, offset);
        Ok(TimeWindow::new(first.start, last.end))
    }

    /// The period immediately before this one.
    ///
    /// Saturates at the earliest representable date.
    pub fn previous(&self) -> Self {
        let back = |date: NaiveDate, days: i64| {
            date.checked_sub_signed(Duration::days(days))
                .unwrap_or(NaiveDate::MIN)
        };
        match *self {
            CalendarPeriod::Day(date) => CalendarPeriod::Day(back(date, 1)),
            CalendarPeriod::Week(date) => CalendarPeriod::Week(back(date, 7)),
            CalendarPeriod::Month(year, 1) => CalendarPeriod::Month(year.saturating_sub(1), 12),
            CalendarPeriod::Month(year, month) => CalendarPeriod::Month(year, month - 1),
            CalendarPeriod::Year(year) => CalendarPeriod::Year(year.saturating_sub(1)),
        }
    }

    /// Get display name for this period.
    pub fn display_name(&self) -> String {
        match *self {
            CalendarPeriod::Day(date) => date.format("%A, %B %-d %Y").to_string(),
            CalendarPeriod::Week(_) => match self.first_day() {
                Ok(monday) => format!("Week of {}", monday.format("%b %d, %Y")),
                Err(_) => "Unknown week".to_string(),
            },
            CalendarPeriod::Month(year, month) => match ymd(year, month, 1) {
                Ok(first) => first.format("%B %Y").to_string(),
                Err(_) => format!("{}-{:02}", year, month),
            },
            CalendarPeriod::Year(year) => format!("{}", year),
        }
    }
}

fn ymd(year: i32, month: u32, day: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
        Error::InvalidWindow(format!("{}-{:02}-{:02} is not a date", year, month, day))
    })
}
