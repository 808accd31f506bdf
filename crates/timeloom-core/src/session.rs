//! A session: one user connection plus the statement pipeline.
//!
//! Every statement a session executes goes parse → pre-hook → (plan
//! optimization would happen here in a full host pipeline) → post-hook →
//! execution on the session's own connection. The engine's private
//! connection never enters this pipeline, so internal queries cannot recurse
//! into the interceptor.

use crate::capture::{CaptureContext, Interceptor, StatementPlan};
use crate::engine::Engine;
use crate::error::TimeloomResult;
use crate::query::{self, Relation, StatementOutput, VersionSpec};
use rusqlite::types::Value;
use rusqlite::Connection;
use sqlparser::ast::Statement;
use std::sync::Arc;

/// A single-threaded session against a timeloom-managed database.
pub struct Session {
    engine: Arc<Engine>,
    conn: Connection,
    ctx: CaptureContext,
    interceptor: Interceptor,
}

impl Session {
    pub(crate) fn new(engine: Arc<Engine>) -> TimeloomResult<Self> {
        let conn = Connection::open(&engine.config().db_path)?;
        let interceptor = Interceptor::new(Arc::clone(&engine));
        Ok(Self {
            engine,
            conn,
            ctx: CaptureContext::new(),
            interceptor,
        })
    }

    /// The shared engine.
    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Run a statement through the interception pipeline.
    pub fn execute(&mut self, sql: &str) -> TimeloomResult<StatementOutput> {
        let plan = StatementPlan::parse(sql)?;
        self.interceptor.pre_hook(&mut self.ctx, &plan)?;
        self.interceptor.post_hook(&mut self.ctx, &plan)?;
        self.run_plan(&plan)
    }

    fn run_plan(&self, plan: &StatementPlan) -> TimeloomResult<StatementOutput> {
        let mut affected = 0usize;
        let mut rows: Option<Relation> = None;

        for statement in plan.statements() {
            match statement {
                Statement::Query(_) => {
                    rows = Some(self.query_rows(&statement.to_string())?);
                }
                _ => {
                    affected += self.conn.execute(&statement.to_string(), [])?;
                    rows = None;
                }
            }
        }

        Ok(match rows {
            Some(relation) => StatementOutput::Rows(relation),
            None => StatementOutput::Count(affected),
        })
    }

    fn query_rows(&self, sql: &str) -> TimeloomResult<Relation> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let n = columns.len();

        let mut relation = Relation::new(columns);
        let mut result_rows = stmt.query([])?;
        while let Some(row) = result_rows.next()? {
            let mut values = Vec::with_capacity(n);
            for i in 0..n {
                values.push(row.get::<_, Value>(i)?);
            }
            relation.rows.push(values);
        }
        Ok(relation)
    }

    /// Force any outstanding capture to materialize before a read.
    fn flush_pending(&mut self) {
        self.interceptor.scheduler().flush(&mut self.ctx);
    }

    /// Enroll a table for versioned history capture.
    pub fn enable_tracking(&mut self, table: &str, pk_column: &str) -> TimeloomResult<String> {
        self.flush_pending();
        self.engine.enable_tracking(table, pk_column)
    }

    /// Drop a table's history and registration. A capture pending for the
    /// table is discarded; its target relation is being dropped anyway.
    pub fn disable_tracking(&mut self, table: &str) -> TimeloomResult<String> {
        self.ctx.discard_for_table(table);
        self.flush_pending();
        self.engine.disable_tracking(table)
    }

    /// Reconstruct a tracked table's contents as of a version or time.
    pub fn time_travel(&mut self, table: &str, spec: VersionSpec) -> TimeloomResult<Relation> {
        self.flush_pending();
        query::read_at(&self.engine, table, &spec)
    }

    /// Classify the rows that changed between two captured versions.
    pub fn diff(
        &mut self,
        table: &str,
        from_version: i64,
        to_version: i64,
    ) -> TimeloomResult<Relation> {
        self.flush_pending();
        query::diff(&self.engine, table, from_version, to_version)
    }

    /// Full per-row, per-column change history of a tracked table.
    pub fn audit_log(&mut self, table: &str) -> TimeloomResult<Relation> {
        self.flush_pending();
        query::audit_log(&self.engine, table)
    }

    /// One row per tracked table: name, key column, current version,
    /// enrollment time.
    pub fn status(&mut self) -> TimeloomResult<Relation> {
        self.flush_pending();

        let mut relation = Relation::new(vec![
            "table_name".to_string(),
            "pk_column".to_string(),
            "current_version".to_string(),
            "created_at".to_string(),
        ]);
        for tracked in self.engine.registry().all()? {
            relation.rows.push(vec![
                Value::Text(tracked.table_name),
                Value::Text(tracked.pk_column),
                Value::Integer(tracked.current_version),
                Value::Text(tracked.created_at.to_rfc3339()),
            ]);
        }
        Ok(relation)
    }

    /// Whether a capture is pending flush. Exposed for hook-timing tests.
    pub fn has_pending_capture(&self) -> bool {
        !self.ctx.is_idle()
    }
}
