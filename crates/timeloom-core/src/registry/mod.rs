//! Tracking registry: the durable mapping of table name to primary-key
//! column and current version counter.

mod store;
mod types;

pub use store::TrackingRegistry;
pub use types::TrackedTable;
