//! History store: one append-only log relation per tracked table.
//!
//! Each record is a full row state observed at a version, plus bookkeeping
//! columns. Records are never updated or deleted; disable-tracking drops the
//! whole relation.

mod record;
mod store;

pub use record::{HistoryOperation, LogRecord, StampedRow};
pub use store::HistoryStore;
