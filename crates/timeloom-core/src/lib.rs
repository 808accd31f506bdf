//! timeloom-core - Core library for timeloom.
//!
//! A versioned-history (time-travel) engine bolted onto SQLite: designated
//! tables get an append-only history relation, mutation statements are
//! intercepted around plan optimization, and a query layer reconstructs
//! point-in-time states, two-version diffs, and per-column audit logs.
//!
//! # Example
//!
//! ```ignore
//! use timeloom_core::{Engine, EngineConfig, VersionSpec};
//!
//! let engine = Engine::open(EngineConfig::at_path("app.db"))?;
//! let mut session = engine.session()?;
//!
//! session.enable_tracking("accounts", "id")?;
//! session.execute("UPDATE accounts SET balance = 75.0 WHERE id = 1")?;
//!
//! // The next statement boundary materializes version 1
//! let now = session.time_travel("accounts", VersionSpec::Number(1))?;
//! let before = session.time_travel("accounts", VersionSpec::Number(0))?;
//! let changed = session.diff("accounts", 0, 1)?;
//! ```

pub mod capture;
pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod query;
pub mod registry;
pub mod session;

// Re-export commonly used types
pub use capture::{CaptureContext, DmlKind, DmlTarget, Interceptor, PendingCapture, StatementPlan};
pub use config::EngineConfig;
pub use engine::{ColumnDef, Diagnostics, Engine};
pub use error::{ErrorCode, TimeloomError, TimeloomResult};
pub use history::{HistoryOperation, HistoryStore};
pub use query::{ChangeType, ColumnChange, Relation, StatementOutput, VersionSpec};
pub use registry::{TrackedTable, TrackingRegistry};
pub use session::Session;
