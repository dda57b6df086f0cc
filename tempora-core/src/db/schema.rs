//! Database schema and migrations
//!
//! Uses SQLite with embedded migrations managed via PRAGMA user_version.
//!
//! Instants are stored as INTEGER microseconds since the Unix epoch (UTC) so
//! range filters compare numerically and duration sums stay exact.

use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 2;

/// SQL migrations, indexed by version number
const MIGRATIONS: &[&str] = &[
    // Version 1: events
    r#"
    CREATE TABLE IF NOT EXISTS events (
        id               TEXT PRIMARY KEY,
        user_id          TEXT NOT NULL,
        title            TEXT NOT NULL DEFAULT '',
        description      TEXT,
        start_time       INTEGER,
        end_time         INTEGER,
        event_type       TEXT NOT NULL,
        repeat           TEXT,
        created_at       DATETIME NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_events_user_start ON events(user_id, start_time);
    "#,
    // Version 2: all-time per-category lookups (category efficiency)
    r#"
    CREATE INDEX IF NOT EXISTS idx_events_user_type ON events(user_id, event_type);
    "#,
];

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> crate::error::Result<()> {
    let current_version: i32 = conn
        .query_row("PRAGMA user_version", [], |r| r.get(0))
        .unwrap_or(0);

    tracing::info!(
        current_version,
        target_version = SCHEMA_VERSION,
        "Checking database migrations"
    );

    for (i, migration) in MIGRATIONS.iter().enumerate() {
        let version = (i + 1) as i32;
        if version > current_version {
            tracing::info!(version, "Running migration");
            conn.execute_batch(migration)?;
            conn.execute(&format!("PRAGMA user_version = {}", version), [])?;
        }
    }

    if current_version < SCHEMA_VERSION {
        tracing::info!(
            from = current_version,
            to = SCHEMA_VERSION,
            "Migrations complete"
        );
    }

    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> crate::error::Result<i32> {
    let version: i32 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    Ok(version)
}
