//! Shared engine state: the private connection, schema introspection,
//! tracking enrollment, and capture diagnostics.
//!
//! All SQL issued here runs on a connection that never enters the statement
//! pipeline, so engine-internal queries are structurally exempt from
//! interception.

use crate::config::EngineConfig;
use crate::error::{TimeloomError, TimeloomResult};
use crate::history::HistoryStore;
use crate::registry::{TrackedTable, TrackingRegistry};
use crate::session::Session;
use chrono::Utc;
use rusqlite::Connection;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Column name and declared type, as reported by schema introspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub decl_type: String,
}

/// Capture diagnostics exposed to operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Diagnostics {
    /// Number of pending captures discarded because a flush write failed.
    pub dropped_captures: u64,
}

/// The shared time-travel engine.
///
/// Owns the private connection used for all registry and history access.
/// Sessions open their own connection to the same database and route user
/// statements through the interception pipeline; the engine's connection
/// never does.
///
/// Concurrent sessions mutating the same tracked table are out of scope:
/// version arming is a read-modify-write on the registry with no
/// cross-session lock.
pub struct Engine {
    conn: Arc<Mutex<Connection>>,
    config: EngineConfig,
    dropped_captures: AtomicU64,
}

impl Engine {
    /// Open an engine for the configured database, creating the registry
    /// relation if needed.
    pub fn open(config: EngineConfig) -> TimeloomResult<Arc<Self>> {
        let is_uri = config.db_path.to_string_lossy().starts_with("file:");
        if let Some(parent) = config.db_path.parent() {
            if !parent.as_os_str().is_empty() && !is_uri {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(&config.db_path)?;
        let engine = Arc::new(Self {
            conn: Arc::new(Mutex::new(conn)),
            config,
            dropped_captures: AtomicU64::new(0),
        });

        engine.registry().init_schema()?;
        debug!(db = %engine.config.db_path.display(), "timeloom engine opened");
        Ok(engine)
    }

    /// Open an engine backed by a process-private in-memory database.
    pub fn in_memory() -> TimeloomResult<Arc<Self>> {
        Self::open(EngineConfig::in_memory())
    }

    /// Open a new session against this engine.
    pub fn session(self: &Arc<Self>) -> TimeloomResult<Session> {
        Session::new(Arc::clone(self))
    }

    /// The engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The tracking registry.
    pub fn registry(&self) -> TrackingRegistry {
        TrackingRegistry::new(Arc::clone(&self.conn), self.config.registry_table.clone())
    }

    /// History store for a tracked table, with freshly introspected columns.
    pub(crate) fn history_store(&self, tracked: &TrackedTable) -> TimeloomResult<HistoryStore> {
        let columns = self.table_columns(&tracked.table_name)?;
        Ok(HistoryStore::new(
            Arc::clone(&self.conn),
            tracked.table_name.clone(),
            self.config.history_table(&tracked.table_name),
            tracked.pk_column.clone(),
            columns,
        ))
    }

    /// Capture diagnostics.
    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics {
            dropped_captures: self.dropped_captures.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn note_dropped_capture(&self) {
        self.dropped_captures.fetch_add(1, Ordering::Relaxed);
    }

    /// Whether a table exists in the database.
    pub(crate) fn table_exists(&self, table: &str) -> TimeloomResult<bool> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Column names and declared types for a table, in definition order.
    pub(crate) fn table_columns(&self, table: &str) -> TimeloomResult<Vec<ColumnDef>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT name, type FROM pragma_table_info(?1) ORDER BY cid")?;
        let columns = stmt
            .query_map([table], |row| {
                Ok(ColumnDef {
                    name: row.get(0)?,
                    decl_type: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(columns)
    }

    /// Enroll a table for versioned history capture.
    ///
    /// Creates the history relation with the union schema, seeds one INSERT
    /// record per existing row at version 0, and registers the table with
    /// `current_version = 0`.
    pub fn enable_tracking(&self, table: &str, pk_column: &str) -> TimeloomResult<String> {
        if !self.table_exists(table)? {
            return Err(TimeloomError::table_not_found(table));
        }
        let columns = self.table_columns(table)?;
        if !columns.iter().any(|c| c.name == pk_column) {
            return Err(TimeloomError::column_not_found(table, pk_column));
        }
        let registry = self.registry();
        if registry.lookup(table)?.is_some() {
            return Err(TimeloomError::already_tracked(table));
        }

        let tracked = TrackedTable {
            table_name: table.to_string(),
            pk_column: pk_column.to_string(),
            current_version: 0,
            created_at: Utc::now(),
        };

        let history = HistoryStore::new(
            Arc::clone(&self.conn),
            tracked.table_name.clone(),
            self.config.history_table(table),
            tracked.pk_column.clone(),
            columns,
        );
        history.create()?;
        history.create_index_best_effort();
        let seeded = history.seed()?;
        registry.insert(&tracked)?;

        info!(table, pk_column, seeded, "tracking enabled");
        Ok(format!(
            "Tracking enabled for table '{}' on key column '{}' ({} existing rows captured at version 0)",
            table, pk_column, seeded
        ))
    }

    /// Drop a table's history and remove it from the registry.
    ///
    /// Irrecoverably discards all captured history for the table.
    pub fn disable_tracking(&self, table: &str) -> TimeloomResult<String> {
        let registry = self.registry();
        let tracked = registry
            .lookup(table)?
            .ok_or_else(|| TimeloomError::not_tracked(table))?;

        let history = self.history_store(&tracked)?;
        history.drop_table()?;
        registry.remove(table)?;

        info!(table, "tracking disabled");
        Ok(format!("Tracking disabled for table '{}'", table))
    }
}

/// Quote an identifier for direct inclusion in SQL text.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
