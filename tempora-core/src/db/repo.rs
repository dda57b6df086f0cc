//! Database repository layer
//!
//! Event inserts plus the read queries the analytics engine issues.

use crate::error::{Error, Result};
use crate::store::{CategoryTotals, EventFilter, EventStore, TypeFilter};
use crate::types::*;
use crate::window::CalendarPeriod;
use chrono::{DateTime, Duration, FixedOffset, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

const EVENT_COLUMNS: &str =
    "id, user_id, title, description, start_time, end_time, event_type, repeat";

/// Database handle (single connection behind a mutex)
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open(path: &PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA cache_size = -64000;  -- 64MB cache
            ",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run migrations on this database
    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn()?;
        super::schema::run_migrations(&conn)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::StoreUnavailable("connection lock poisoned".to_string()))
    }

    // ============================================
    // Event writes
    // ============================================

    /// Insert or replace an event
    pub fn insert_event(&self, event: &Event) -> Result<()> {
        let conn = self.conn()?;
        Self::write_event(&conn, event)?;
        Ok(())
    }

    /// Insert a batch of events in one transaction, returning how many were written
    pub fn insert_events(&self, events: &[Event]) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        for event in events {
            Self::write_event(&tx, event)?;
        }
        tx.commit()?;

        tracing::debug!(count = events.len(), "Inserted events");
        Ok(events.len())
    }

    fn write_event(conn: &Connection, event: &Event) -> rusqlite::Result<usize> {
        conn.execute(
            r#"
            INSERT INTO events (id, user_id, title, description, start_time, end_time,
                                event_type, repeat, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(id) DO UPDATE SET
                user_id = excluded.user_id,
                title = excluded.title,
                description = excluded.description,
                start_time = excluded.start_time,
                end_time = excluded.end_time,
                event_type = excluded.event_type,
                repeat = excluded.repeat
            "#,
            params![
                event.id,
                event.user_id,
                event.title,
                event.description,
                event.start_time.map(|t| t.timestamp_micros()),
                event.end_time.map(|t| t.timestamp_micros()),
                event.event_type,
                event.repeat.map(|r| r.as_str()),
                Utc::now().to_rfc3339(),
            ],
        )
    }

    // ============================================
    // Event reads
    // ============================================

    /// Get an event by ID
    pub fn get_event(&self, id: &str) -> Result<Option<Event>> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {} FROM events WHERE id = ?", EVENT_COLUMNS),
            [id],
            Self::row_to_event,
        )
        .optional()
        .map_err(Error::from)
    }

    /// Count all events owned by a user
    pub fn count_events(&self, user_id: &str) -> Result<i64> {
        let conn = self.conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM events WHERE user_id = ?",
            [user_id],
            |r| r.get(0),
        )?;
        Ok(count)
    }

    /// Events starting within a calendar period, ordered by start time
    pub fn events_in_period(
        &self,
        user_id: &str,
        period: &CalendarPeriod,
        offset: FixedOffset,
    ) -> Result<Vec<Event>> {
        let window = period.window(offset)?;
        self.find(&EventFilter::for_user(user_id).started_within(window).sorted())
    }

    fn row_to_event(row: &Row) -> rusqlite::Result<Event> {
        let start_us: Option<i64> = row.get("start_time")?;
        let end_us: Option<i64> = row.get("end_time")?;
        let repeat_str: Option<String> = row.get("repeat")?;

        Ok(Event {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            title: row.get("title")?,
            description: row.get("description")?,
            start_time: start_us.and_then(from_micros),
            end_time: end_us.and_then(from_micros),
            event_type: row.get("event_type")?,
            repeat: repeat_str.and_then(|s| s.parse().ok()),
        })
    }
}

fn from_micros(us: i64) -> Option<DateTime<Utc>> {
    let secs = us.div_euclid(1_000_000);
    let nanos = (us.rem_euclid(1_000_000) * 1_000) as u32;
    DateTime::from_timestamp(secs, nanos)
}

/// Build the WHERE clause shared by `find` and `aggregate_by_type`.
fn where_clause(filter: &EventFilter) -> (String, Vec<Value>) {
    let mut sql = String::from("WHERE user_id = ?");
    let mut args = vec![Value::Text(filter.user_id.clone())];

    if let Some(window) = &filter.start_within {
        sql.push_str(" AND start_time >= ? AND start_time <= ?");
        args.push(Value::Integer(window.start.timestamp_micros()));
        args.push(Value::Integer(window.end.timestamp_micros()));
    }
    if let Some(window) = &filter.end_within {
        sql.push_str(" AND end_time >= ? AND end_time <= ?");
        args.push(Value::Integer(window.start.timestamp_micros()));
        args.push(Value::Integer(window.end.timestamp_micros()));
    }
    match &filter.event_type {
        TypeFilter::Any => {}
        TypeFilter::Equals(category) => {
            sql.push_str(" AND event_type = ?");
            args.push(Value::Text(category.clone()));
        }
        TypeFilter::In(categories) if categories.is_empty() => sql.push_str(" AND 0"),
        TypeFilter::In(categories) => {
            let placeholders = vec!["?"; categories.len()].join(", ");
            sql.push_str(&format!(" AND event_type IN ({})", placeholders));
            args.extend(categories.iter().cloned().map(Value::Text));
        }
    }

    (sql, args)
}

/// Query-time failures surface as `StoreUnavailable`.
fn unavailable(operation: &str, err: rusqlite::Error) -> Error {
    tracing::warn!(operation, error = %err, "Event store query failed");
    Error::StoreUnavailable(format!("{}: {}", operation, err))
}

impl EventStore for Database {
    fn find(&self, filter: &EventFilter) -> Result<Vec<Event>> {
        let conn = self.conn()?;
        let (where_sql, args) = where_clause(filter);
        let order = if filter.sorted {
            "ORDER BY start_time ASC, rowid ASC"
        } else {
            "ORDER BY rowid ASC"
        };
        let sql = format!("SELECT {} FROM events {} {}", EVENT_COLUMNS, where_sql, order);

        let mut stmt = conn.prepare(&sql).map_err(|e| unavailable("find", e))?;
        let events = stmt
            .query_map(params_from_iter(args.iter()), Self::row_to_event)
            .map_err(|e| unavailable("find", e))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| unavailable("find", e))?;

        Ok(events)
    }

    /// Grouped in SQL over integer microseconds; malformed rows add zero.
    fn aggregate_by_type(&self, filter: &EventFilter) -> Result<Vec<CategoryTotals>> {
        let conn = self.conn()?;
        let (where_sql, args) = where_clause(filter);
        let sql = format!(
            r#"
            SELECT event_type,
                   SUM(CASE
                           WHEN start_time IS NULL OR end_time IS NULL OR end_time < start_time
                           THEN 0
                           ELSE end_time - start_time
                       END) AS total_us,
                   COUNT(*) AS event_count
            FROM events
            {}
            GROUP BY event_type
            ORDER BY total_us DESC, MIN(rowid) ASC
            "#,
            where_sql
        );

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| unavailable("aggregate_by_type", e))?;
        let totals = stmt
            .query_map(params_from_iter(args.iter()), |row| {
                let total_us: i64 = row.get("total_us")?;
                Ok(CategoryTotals {
                    event_type: row.get("event_type")?,
                    total_hours: duration_hours(Duration::microseconds(total_us)),
                    event_count: row.get("event_count")?,
                })
            })
            .map_err(|e| unavailable("aggregate_by_type", e))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| unavailable("aggregate_by_type", e))?;

        Ok(totals)
    }
}
