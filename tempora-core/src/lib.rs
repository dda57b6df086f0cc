//! # tempora-core
//!
//! Core library for tempora - time analytics over calendar events.
//!
//! This library provides:
//! - Domain types for events and the aggregate rows built from them
//! - An [`EventStore`] seam with SQLite and in-memory implementations
//! - The [`TimeAnalytics`] engine: distribution, trends, peak hours, efficiency
//! - Chart rendering, configuration management and logging infrastructure
//!
//! ## Example
//!
//! ```rust,no_run
//! use tempora_core::{Config, Database, TimeAnalytics};
//!
//! let config = Config::load().expect("failed to load config");
//!
//! let db = Database::open(&Config::database_path()).expect("failed to open database");
//! db.migrate().expect("failed to run migrations");
//!
//! let analytics = TimeAnalytics::from_config(&db, &config.analytics).expect("bad config");
//! let rows = analytics.time_distribution("alice", 30).expect("query failed");
//! for row in rows {
//!     println!("{}: {:.2}h over {} events", row.category, row.total_hours, row.event_count);
//! }
//! ```

// Re-export commonly used items at the crate root
pub use analytics::{AnalyticsDashboard, TimeAnalytics};
pub use charts::{ChartRenderer, SvgChartRenderer};
pub use config::Config;
pub use db::Database;
pub use error::{Error, Result};
pub use store::{CategoryTotals, EventFilter, EventStore, MemoryStore, TypeFilter};
pub use types::*;
pub use window::{CalendarPeriod, TimeWindow};

// Public modules
pub mod analytics;
pub mod charts;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod store;
pub mod types;
pub mod window;
