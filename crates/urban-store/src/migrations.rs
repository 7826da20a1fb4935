//! Database schema migrations.
//!
//! Applies the initial schema: reports, users, and the single-slot session
//! table that remembers who is signed in.

use rusqlite::Connection;
use tracing::info;

use crate::error::StoreError;

/// Run all pending database migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )?;

    let current_version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: initial_schema");
    }

    Ok(())
}

/// Version 1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS reports (
            id           TEXT PRIMARY KEY NOT NULL,
            reporter     TEXT NOT NULL,
            issue_type   TEXT NOT NULL,
            location     TEXT NOT NULL,
            description  TEXT NOT NULL,
            photo_url    TEXT,
            status       TEXT NOT NULL DEFAULT 'pending'
                         CHECK (status IN ('pending', 'in_progress', 'resolved')),
            created_at   INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_reports_created_at
            ON reports (created_at DESC);

        CREATE TABLE IF NOT EXISTS users (
            id             TEXT PRIMARY KEY NOT NULL,
            name           TEXT NOT NULL,
            email          TEXT NOT NULL UNIQUE,
            password_salt  TEXT NOT NULL,
            password_hash  TEXT NOT NULL,
            photo_url      TEXT NOT NULL,
            created_at     INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS session (
            slot          INTEGER PRIMARY KEY CHECK (slot = 1),
            user_id       TEXT NOT NULL REFERENCES users (id) ON DELETE CASCADE,
            signed_in_at  INTEGER NOT NULL
        );

        INSERT INTO schema_migrations (version, name) VALUES (1, 'initial_schema');
        ",
    )?;
    Ok(())
}
