//! SQLite-backed history store for a single tracked table.

use crate::engine::{quote_ident, ColumnDef};
use crate::error::TimeloomResult;
use crate::history::{HistoryOperation, LogRecord, StampedRow};
use rusqlite::types::Value;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Append-only history relation for one tracked table.
///
/// Schema is the tracked table's columns plus four bookkeeping columns:
/// `version`, `operation`, `captured_at`, `pk_value`.
pub struct HistoryStore {
    conn: Arc<Mutex<Connection>>,
    source: String,
    history: String,
    pk_column: String,
    columns: Vec<ColumnDef>,
}

impl HistoryStore {
    pub(crate) fn new(
        conn: Arc<Mutex<Connection>>,
        source: String,
        history: String,
        pk_column: String,
        columns: Vec<ColumnDef>,
    ) -> Self {
        Self {
            conn,
            source,
            history,
            pk_column,
            columns,
        }
    }

    /// Comma-joined quoted original column names.
    fn column_list(&self) -> String {
        self.columns
            .iter()
            .map(|c| quote_ident(&c.name))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Create the history relation with the union schema.
    pub(crate) fn create(&self) -> TimeloomResult<()> {
        let mut defs: Vec<String> = self
            .columns
            .iter()
            .map(|c| {
                if c.decl_type.is_empty() {
                    quote_ident(&c.name)
                } else {
                    format!("{} {}", quote_ident(&c.name), c.decl_type)
                }
            })
            .collect();
        defs.push("version INTEGER NOT NULL".to_string());
        defs.push("operation TEXT NOT NULL".to_string());
        defs.push("captured_at TEXT NOT NULL".to_string());
        defs.push("pk_value TEXT NOT NULL".to_string());

        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "CREATE TABLE {} ({})",
                quote_ident(&self.history),
                defs.join(", ")
            ),
            [],
        )?;
        Ok(())
    }

    /// Create the (pk_value, version) lookup index. Non-fatal on failure.
    pub(crate) fn create_index_best_effort(&self) {
        let conn = self.conn.lock().unwrap();
        let result = conn.execute(
            &format!(
                "CREATE INDEX IF NOT EXISTS {} ON {} (pk_value, version)",
                quote_ident(&format!("idx_{}_pk_version", self.history)),
                quote_ident(&self.history)
            ),
            [],
        );
        if let Err(e) = result {
            debug!(history = %self.history, error = %e, "history index creation failed");
        }
    }

    /// Drop the history relation.
    pub(crate) fn drop_table(&self) -> TimeloomResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!("DROP TABLE IF EXISTS {}", quote_ident(&self.history)),
            [],
        )?;
        Ok(())
    }

    /// Seed one INSERT record per existing row at version 0.
    ///
    /// Returns the number of rows seeded.
    pub(crate) fn seed(&self) -> TimeloomResult<usize> {
        let conn = self.conn.lock().unwrap();
        let count = conn.execute(
            &format!(
                "INSERT INTO {hist} ({cols}, version, operation, captured_at, pk_value)
                 SELECT {cols}, 0, 'INSERT', ?1, CAST({pk} AS TEXT) FROM {src}",
                hist = quote_ident(&self.history),
                cols = self.column_list(),
                pk = quote_ident(&self.pk_column),
                src = quote_ident(&self.source),
            ),
            params![chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(count)
    }

    /// Insert one SNAPSHOT record per row currently in the tracked table.
    pub(crate) fn insert_snapshot(&self, version: i64, captured_at: &str) -> TimeloomResult<usize> {
        let conn = self.conn.lock().unwrap();
        let count = conn.execute(
            &format!(
                "INSERT INTO {hist} ({cols}, version, operation, captured_at, pk_value)
                 SELECT {cols}, ?1, 'SNAPSHOT', ?2, CAST({pk} AS TEXT) FROM {src}",
                hist = quote_ident(&self.history),
                cols = self.column_list(),
                pk = quote_ident(&self.pk_column),
                src = quote_ident(&self.source),
            ),
            params![version, captured_at],
        )?;
        Ok(count)
    }

    /// Insert a synthetic DELETE record at `version` for every primary key
    /// whose latest record below `version` is not already a DELETE and which
    /// is absent from the current row set. The marker carries the last-known
    /// column values.
    ///
    /// Must run after `insert_snapshot` for the same version; the ranking
    /// subquery only considers records strictly below `version`.
    pub(crate) fn insert_delete_markers(
        &self,
        version: i64,
        captured_at: &str,
    ) -> TimeloomResult<usize> {
        let conn = self.conn.lock().unwrap();
        let count = conn.execute(
            &format!(
                "INSERT INTO {hist} ({cols}, version, operation, captured_at, pk_value)
                 SELECT {cols}, ?1, 'DELETE', ?2, pk_value
                 FROM (
                     SELECT h.*, ROW_NUMBER() OVER (
                         PARTITION BY pk_value ORDER BY version DESC
                     ) AS rn
                     FROM {hist} h
                     WHERE version < ?1
                 )
                 WHERE rn = 1
                   AND operation <> 'DELETE'
                   AND pk_value NOT IN (SELECT CAST({pk} AS TEXT) FROM {src})",
                hist = quote_ident(&self.history),
                cols = self.column_list(),
                pk = quote_ident(&self.pk_column),
                src = quote_ident(&self.source),
            ),
            params![version, captured_at],
        )?;
        Ok(count)
    }

    /// Reconstruct the logical row set as of `version`: per primary key, the
    /// most recent record with version <= `version` whose operation is not
    /// DELETE. Ordered by pk_value.
    pub(crate) fn rows_at_version(&self, version: i64) -> TimeloomResult<Vec<StampedRow>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {cols}, pk_value, version
             FROM (
                 SELECT h.*, ROW_NUMBER() OVER (
                     PARTITION BY pk_value ORDER BY version DESC
                 ) AS rn
                 FROM {hist} h
                 WHERE version <= ?1
             )
             WHERE rn = 1 AND operation <> 'DELETE'
             ORDER BY pk_value",
            cols = self.column_list(),
            hist = quote_ident(&self.history),
        ))?;

        let n = self.columns.len();
        let rows = stmt
            .query_map([version], |row| {
                let mut values = Vec::with_capacity(n);
                for i in 0..n {
                    values.push(row.get::<_, Value>(i)?);
                }
                Ok(StampedRow {
                    pk_value: row.get(n)?,
                    version: row.get(n + 1)?,
                    values,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Largest version whose capture time is at or before `timestamp`
    /// (RFC 3339 text, compared lexicographically as stored).
    pub(crate) fn resolve_as_of(&self, timestamp: &str) -> TimeloomResult<Option<i64>> {
        let conn = self.conn.lock().unwrap();
        let version: Option<i64> = conn.query_row(
            &format!(
                "SELECT MAX(version) FROM {} WHERE captured_at <= ?1",
                quote_ident(&self.history)
            ),
            [timestamp],
            |row| row.get(0),
        )?;
        Ok(version)
    }

    /// Every history record, grouped by primary key and ordered by version
    /// within each key. Used for audit-log reconstruction.
    pub(crate) fn log_records(&self) -> TimeloomResult<Vec<LogRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {cols}, version, operation, captured_at, pk_value
             FROM {hist}
             ORDER BY pk_value, version",
            cols = self.column_list(),
            hist = quote_ident(&self.history),
        ))?;

        let n = self.columns.len();
        let records = stmt
            .query_map([], |row| {
                let mut values = Vec::with_capacity(n);
                for i in 0..n {
                    values.push(row.get::<_, Value>(i)?);
                }
                let operation: String = row.get(n + 1)?;
                Ok((
                    values,
                    row.get::<_, i64>(n)?,
                    operation,
                    row.get::<_, String>(n + 2)?,
                    row.get::<_, String>(n + 3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        records
            .into_iter()
            .map(|(values, version, operation, captured_at, pk_value)| {
                let operation = HistoryOperation::from_str(&operation).ok_or_else(|| {
                    crate::error::TimeloomError::database(format!(
                        "unknown history operation '{}'",
                        operation
                    ))
                })?;
                Ok(LogRecord {
                    pk_value,
                    version,
                    operation,
                    captured_at,
                    values,
                })
            })
            .collect()
    }

    /// Original column names, in definition order.
    pub(crate) fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_accounts() -> HistoryStore {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE accounts (id INTEGER, name TEXT);
            INSERT INTO accounts VALUES (1, 'alice'), (2, 'bob');
            "#,
        )
        .unwrap();

        let columns = vec![
            ColumnDef {
                name: "id".to_string(),
                decl_type: "INTEGER".to_string(),
            },
            ColumnDef {
                name: "name".to_string(),
                decl_type: "TEXT".to_string(),
            },
        ];
        let store = HistoryStore::new(
            Arc::new(Mutex::new(conn)),
            "accounts".to_string(),
            "timeloom_history_accounts".to_string(),
            "id".to_string(),
            columns,
        );
        store.create().unwrap();
        store.create_index_best_effort();
        store
    }

    fn exec(store: &HistoryStore, sql: &str) {
        store.conn.lock().unwrap().execute(sql, []).unwrap();
    }

    #[test]
    fn test_seed_captures_existing_rows() {
        let store = store_with_accounts();
        assert_eq!(store.seed().unwrap(), 2);

        let rows = store.rows_at_version(0).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].pk_value, "1");
        assert_eq!(rows[0].version, 0);
        assert_eq!(rows[1].pk_value, "2");
    }

    #[test]
    fn test_snapshot_supersedes_seed() {
        let store = store_with_accounts();
        store.seed().unwrap();

        exec(&store, "UPDATE accounts SET name = 'alicia' WHERE id = 1");
        store.insert_snapshot(1, "2024-01-02T00:00:00+00:00").unwrap();
        store
            .insert_delete_markers(1, "2024-01-02T00:00:00+00:00")
            .unwrap();

        let v1 = store.rows_at_version(1).unwrap();
        assert_eq!(v1.len(), 2);
        assert_eq!(v1[0].values[1], Value::Text("alicia".to_string()));
        assert_eq!(v1[0].version, 1);

        // Version 0 still reconstructs the original state
        let v0 = store.rows_at_version(0).unwrap();
        assert_eq!(v0[0].values[1], Value::Text("alice".to_string()));
    }

    #[test]
    fn test_delete_marker_excludes_key() {
        let store = store_with_accounts();
        store.seed().unwrap();

        exec(&store, "DELETE FROM accounts WHERE id = 2");
        store.insert_snapshot(1, "2024-01-02T00:00:00+00:00").unwrap();
        let markers = store
            .insert_delete_markers(1, "2024-01-02T00:00:00+00:00")
            .unwrap();
        assert_eq!(markers, 1);

        let v1 = store.rows_at_version(1).unwrap();
        assert_eq!(v1.len(), 1);
        assert_eq!(v1[0].pk_value, "1");

        // The marker carries the last-known values
        let log = store.log_records().unwrap();
        let marker = log
            .iter()
            .find(|r| r.operation == HistoryOperation::Delete)
            .unwrap();
        assert_eq!(marker.pk_value, "2");
        assert_eq!(marker.version, 1);
        assert_eq!(marker.values[1], Value::Text("bob".to_string()));
    }

    #[test]
    fn test_delete_marker_not_repeated() {
        let store = store_with_accounts();
        store.seed().unwrap();

        exec(&store, "DELETE FROM accounts WHERE id = 2");
        store.insert_snapshot(1, "2024-01-02T00:00:00+00:00").unwrap();
        store
            .insert_delete_markers(1, "2024-01-02T00:00:00+00:00")
            .unwrap();

        // A later flush must not emit a second marker for the same key
        store.insert_snapshot(2, "2024-01-03T00:00:00+00:00").unwrap();
        let markers = store
            .insert_delete_markers(2, "2024-01-03T00:00:00+00:00")
            .unwrap();
        assert_eq!(markers, 0);
    }

    #[test]
    fn test_resolve_as_of() {
        let store = store_with_accounts();
        store.seed().unwrap();
        store.insert_snapshot(1, "2024-06-01T12:00:00+00:00").unwrap();
        store.insert_snapshot(2, "2024-06-02T12:00:00+00:00").unwrap();

        assert_eq!(
            store.resolve_as_of("2024-06-01T18:00:00+00:00").unwrap(),
            Some(1)
        );
        assert_eq!(
            store.resolve_as_of("2024-06-03T00:00:00+00:00").unwrap(),
            Some(2)
        );
        assert_eq!(store.resolve_as_of("1999-01-01T00:00:00+00:00").unwrap(), None);
    }

    #[test]
    fn test_log_records_grouped_by_key() {
        let store = store_with_accounts();
        store.seed().unwrap();
        exec(&store, "UPDATE accounts SET name = 'alicia' WHERE id = 1");
        store.insert_snapshot(1, "2024-06-01T00:00:00+00:00").unwrap();

        let log = store.log_records().unwrap();
        assert_eq!(log.len(), 4);
        // Ordered by pk_value then version
        assert_eq!((log[0].pk_value.as_str(), log[0].version), ("1", 0));
        assert_eq!((log[1].pk_value.as_str(), log[1].version), ("1", 1));
        assert_eq!((log[2].pk_value.as_str(), log[2].version), ("2", 0));
    }
}
