//! Relation value types returned by the query engine.

use rusqlite::types::Value;
use serde::Serialize;

/// A column-named result set.
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Relation {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell value by row index and column name.
    pub fn cell(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx)
    }
}

/// Output of one pipeline statement.
#[derive(Debug, Clone, PartialEq)]
pub enum StatementOutput {
    /// Result rows of a query.
    Rows(Relation),
    /// Rows affected by DML/DDL.
    Count(usize),
}

impl StatementOutput {
    /// The result relation, if this output carries rows.
    pub fn rows(&self) -> Option<&Relation> {
        match self {
            StatementOutput::Rows(relation) => Some(relation),
            StatementOutput::Count(_) => None,
        }
    }
}

/// Classification of a primary key in a two-version diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeType {
    Insert,
    Update,
    Delete,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Insert => "INSERT",
            ChangeType::Update => "UPDATE",
            ChangeType::Delete => "DELETE",
        }
    }
}

/// One changed column in a diff or audit-log row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnChange {
    pub column: String,
    pub from_value: serde_json::Value,
    pub to_value: serde_json::Value,
}

/// Convert a SQLite value to JSON for the `changes` cells.
pub(crate) fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Integer(i) => serde_json::Value::from(*i),
        Value::Real(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Text(s) => serde_json::Value::from(s.as_str()),
        Value::Blob(b) => serde_json::Value::from(b.clone()),
    }
}

/// Serialize a change list for a `changes` cell.
pub(crate) fn changes_cell(changes: &[ColumnChange]) -> Value {
    match serde_json::to_string(changes) {
        Ok(json) => Value::Text(json),
        Err(_) => Value::Null,
    }
}

/// Per-column differences between two row states, in column order.
pub(crate) fn column_changes(
    columns: &[String],
    from: &[Value],
    to: &[Value],
) -> Vec<ColumnChange> {
    columns
        .iter()
        .zip(from.iter().zip(to.iter()))
        .filter(|(_, (f, t))| f != t)
        .map(|(column, (f, t))| ColumnChange {
            column: column.clone(),
            from_value: value_to_json(f),
            to_value: value_to_json(t),
        })
        .collect()
}
