//! History record types.

use rusqlite::types::Value;
use serde::{Deserialize, Serialize};

/// Operation marker on a history record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HistoryOperation {
    /// Initial seeding of a pre-existing row at version 0.
    Insert,
    /// Full-state capture of a row at a version > 0.
    Snapshot,
    /// Synthetic marker for a key absent at this version, carrying the
    /// last-known column values.
    Delete,
}

impl HistoryOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryOperation::Insert => "INSERT",
            HistoryOperation::Snapshot => "SNAPSHOT",
            HistoryOperation::Delete => "DELETE",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "INSERT" => Some(HistoryOperation::Insert),
            "SNAPSHOT" => Some(HistoryOperation::Snapshot),
            "DELETE" => Some(HistoryOperation::Delete),
            _ => None,
        }
    }
}

/// A reconstructed row with its version stamp: the most recent capture of a
/// primary key at or below some version.
#[derive(Debug, Clone)]
pub struct StampedRow {
    /// String form of the primary key.
    pub pk_value: String,
    /// Version the row state was captured at.
    pub version: i64,
    /// Original-table column values, in definition order.
    pub values: Vec<Value>,
}

/// A raw history record as read back for audit-log reconstruction.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub pk_value: String,
    pub version: i64,
    pub operation: HistoryOperation,
    pub captured_at: String,
    /// Original-table column values, in definition order.
    pub values: Vec<Value>,
}
