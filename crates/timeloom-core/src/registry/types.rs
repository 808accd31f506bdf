//! Registry row types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A table enrolled for versioned history capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedTable {
    /// Name of the tracked relation.
    pub table_name: String,
    /// User-designated column identifying a logical row across versions.
    pub pk_column: String,
    /// Monotonically increasing version counter. Incremented only by the
    /// capture scheduler's arm step.
    pub current_version: i64,
    /// When tracking was enabled.
    pub created_at: DateTime<Utc>,
}
