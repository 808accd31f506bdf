//! Two-version differencing.

use crate::engine::Engine;
use crate::error::{TimeloomError, TimeloomResult};
use crate::history::StampedRow;
use crate::query::relation::{changes_cell, column_changes};
use crate::query::{ChangeType, Relation};
use rusqlite::types::Value;
use std::collections::HashMap;

/// Classify the primary keys of two point-in-time states.
///
/// Present in both with differing version stamps: UPDATE, with a per-column
/// change list for every column where the two states differ (possibly empty,
/// since a snapshot re-stamps unchanged rows). Present only at `to`: INSERT.
/// Present only at `from`: DELETE. Keys whose version stamp did not move are
/// omitted. Result schema is the original columns plus `change_type` and
/// `changes`; rows are ordered by the string form of the primary key.
pub(crate) fn diff(
    engine: &Engine,
    table: &str,
    from_version: i64,
    to_version: i64,
) -> TimeloomResult<Relation> {
    let tracked = engine
        .registry()
        .lookup(table)?
        .ok_or_else(|| TimeloomError::not_tracked(table))?;
    let history = engine.history_store(&tracked)?;

    let from_rows = super::timetravel::stamped_state(&history, from_version)?;
    let to_rows = super::timetravel::stamped_state(&history, to_version)?;

    let from_by_pk: HashMap<&str, &StampedRow> =
        from_rows.iter().map(|r| (r.pk_value.as_str(), r)).collect();
    let to_by_pk: HashMap<&str, &StampedRow> =
        to_rows.iter().map(|r| (r.pk_value.as_str(), r)).collect();

    let mut columns = history.column_names();
    let original_count = columns.len();
    columns.push("change_type".to_string());
    columns.push("changes".to_string());
    let mut relation = Relation::new(columns);

    // (pk, row) pairs collected first so output order is by pk_value
    let mut classified: Vec<(String, Vec<Value>)> = Vec::new();

    for to_row in &to_rows {
        match from_by_pk.get(to_row.pk_value.as_str()) {
            Some(from_row) => {
                if from_row.version == to_row.version {
                    continue;
                }
                let changes =
                    column_changes(&relation.columns[..original_count], &from_row.values, &to_row.values);
                let mut row = to_row.values.clone();
                row.push(Value::Text(ChangeType::Update.as_str().to_string()));
                row.push(changes_cell(&changes));
                classified.push((to_row.pk_value.clone(), row));
            }
            None => {
                let mut row = to_row.values.clone();
                row.push(Value::Text(ChangeType::Insert.as_str().to_string()));
                row.push(Value::Null);
                classified.push((to_row.pk_value.clone(), row));
            }
        }
    }

    for from_row in &from_rows {
        if to_by_pk.contains_key(from_row.pk_value.as_str()) {
            continue;
        }
        let mut row = from_row.values.clone();
        row.push(Value::Text(ChangeType::Delete.as_str().to_string()));
        row.push(Value::Null);
        classified.push((from_row.pk_value.clone(), row));
    }

    classified.sort_by(|a, b| a.0.cmp(&b.0));
    relation.rows = classified.into_iter().map(|(_, row)| row).collect();
    Ok(relation)
}
