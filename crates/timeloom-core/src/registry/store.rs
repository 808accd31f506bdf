//! SQLite-backed tracking registry.

use crate::engine::quote_ident;
use crate::error::{TimeloomError, TimeloomResult};
use crate::registry::TrackedTable;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

/// Registry of tracked tables, stored in a single relation on the engine's
/// private connection.
pub struct TrackingRegistry {
    conn: Arc<Mutex<Connection>>,
    table: String,
}

impl TrackingRegistry {
    pub(crate) fn new(conn: Arc<Mutex<Connection>>, table: String) -> Self {
        Self { conn, table }
    }

    /// Create the registry relation if it doesn't exist.
    pub(crate) fn init_schema(&self) -> TimeloomResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                r#"
                CREATE TABLE IF NOT EXISTS {} (
                    table_name      TEXT PRIMARY KEY,
                    pk_column       TEXT NOT NULL,
                    current_version INTEGER NOT NULL,
                    created_at      TEXT NOT NULL
                )
                "#,
                quote_ident(&self.table)
            ),
            [],
        )?;
        Ok(())
    }

    /// Register a table.
    pub(crate) fn insert(&self, tracked: &TrackedTable) -> TimeloomResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "INSERT INTO {} (table_name, pk_column, current_version, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                quote_ident(&self.table)
            ),
            params![
                tracked.table_name,
                tracked.pk_column,
                tracked.current_version,
                tracked.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Remove a table's registration.
    pub(crate) fn remove(&self, table: &str) -> TimeloomResult<bool> {
        let conn = self.conn.lock().unwrap();
        let count = conn.execute(
            &format!("DELETE FROM {} WHERE table_name = ?1", quote_ident(&self.table)),
            [table],
        )?;
        Ok(count > 0)
    }

    /// Look up a tracked table. Read-only and cheap; called by the
    /// interceptor on every statement.
    pub fn lookup(&self, table: &str) -> TimeloomResult<Option<TrackedTable>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT table_name, pk_column, current_version, created_at
             FROM {} WHERE table_name = ?1",
            quote_ident(&self.table)
        ))?;

        stmt.query_row([table], |row| Ok(Self::row_to_tracked(row)))
            .optional()?
            .transpose()
    }

    /// All tracked tables, ordered by name.
    pub fn all(&self) -> TimeloomResult<Vec<TrackedTable>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT table_name, pk_column, current_version, created_at
             FROM {} ORDER BY table_name",
            quote_ident(&self.table)
        ))?;

        let results = stmt.query_map([], |row| Ok(Self::row_to_tracked(row)))?;
        results
            .map(|r| r.map_err(|e| e.into()).and_then(|inner| inner))
            .collect()
    }

    /// Increment a table's version counter and return the new value.
    pub(crate) fn bump_version(&self, table: &str) -> TimeloomResult<i64> {
        let conn = self.conn.lock().unwrap();
        let version: i64 = conn.query_row(
            &format!(
                "UPDATE {} SET current_version = current_version + 1
                 WHERE table_name = ?1
                 RETURNING current_version",
                quote_ident(&self.table)
            ),
            [table],
            |row| row.get(0),
        )?;
        Ok(version)
    }

    fn row_to_tracked(row: &rusqlite::Row<'_>) -> TimeloomResult<TrackedTable> {
        let created_at: String = row.get(3)?;
        Ok(TrackedTable {
            table_name: row.get(0)?,
            pk_column: row.get(1)?,
            current_version: row.get(2)?,
            created_at: DateTime::parse_from_rfc3339(&created_at)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| TimeloomError::database(e.to_string()))?,
        })
    }
}
