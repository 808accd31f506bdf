//! Audit-log reconstruction: the full per-row, per-column change history.

use crate::engine::Engine;
use crate::error::{TimeloomError, TimeloomResult};
use crate::history::HistoryOperation;
use crate::query::relation::{changes_cell, column_changes};
use crate::query::Relation;
use rusqlite::types::Value;

/// Every history record with a per-column change list computed against the
/// immediately preceding record for the same primary key.
///
/// Records with no predecessor and DELETE markers get no change list.
/// Result schema is the original columns plus the bookkeeping columns plus
/// `changes`; rows are ordered by (version, pk_value).
pub(crate) fn audit_log(engine: &Engine, table: &str) -> TimeloomResult<Relation> {
    let tracked = engine
        .registry()
        .lookup(table)?
        .ok_or_else(|| TimeloomError::not_tracked(table))?;
    let history = engine.history_store(&tracked)?;

    let original_columns = history.column_names();
    let mut columns = original_columns.clone();
    columns.push("version".to_string());
    columns.push("operation".to_string());
    columns.push("captured_at".to_string());
    columns.push("pk_value".to_string());
    columns.push("changes".to_string());
    let mut relation = Relation::new(columns);

    // Records arrive grouped by pk and ordered by version within each group,
    // so the predecessor is simply the previous record of the same key.
    let records = history.log_records()?;
    let mut output: Vec<((i64, String), Vec<Value>)> = Vec::with_capacity(records.len());
    let mut previous: Option<&crate::history::LogRecord> = None;

    for record in &records {
        let predecessor = previous.filter(|p| p.pk_value == record.pk_value);

        let changes = match (predecessor, record.operation) {
            (Some(_), HistoryOperation::Delete) | (None, _) => Value::Null,
            (Some(prev), _) => changes_cell(&column_changes(
                &original_columns,
                &prev.values,
                &record.values,
            )),
        };

        let mut row = record.values.clone();
        row.push(Value::Integer(record.version));
        row.push(Value::Text(record.operation.as_str().to_string()));
        row.push(Value::Text(record.captured_at.clone()));
        row.push(Value::Text(record.pk_value.clone()));
        row.push(changes);

        output.push(((record.version, record.pk_value.clone()), row));
        previous = Some(record);
    }

    output.sort_by(|a, b| a.0.cmp(&b.0));
    relation.rows = output.into_iter().map(|(_, row)| row).collect();
    Ok(relation)
}
