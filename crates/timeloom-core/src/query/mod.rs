//! Read-side algorithms over the history store: point-in-time
//! reconstruction, two-version differencing, and audit-log reconstruction.

mod audit;
mod diff;
mod relation;
mod timetravel;

pub use relation::{ChangeType, ColumnChange, Relation, StatementOutput};
pub use timetravel::VersionSpec;

pub(crate) use audit::audit_log;
pub(crate) use diff::diff;
pub(crate) use timetravel::read_at;
