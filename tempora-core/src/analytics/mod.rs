//! Analytics module for tempora
//!
//! Turns stored events into aggregate productivity views:
//! - Time distribution by category
//! - Daily productivity trend
//! - Peak hours (hour-of-day profile of work)
//! - Category efficiency (average event length)
//!
//! See [`engine`] for the semantics of each view and [`dashboard`] for the
//! bundle that computes all of them at once.

pub mod dashboard;
pub mod engine;

pub use dashboard::{format_hour_range, AnalyticsDashboard};
pub use engine::{
    TimeAnalytics, DEFAULT_DISTRIBUTION_DAYS, DEFAULT_PEAK_DAYS, DEFAULT_TREND_DAYS,
    MAX_TREND_DAYS, MAX_WINDOW_DAYS,
};
