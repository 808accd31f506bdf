//! Write-path capture machinery: statement plan inspection, the per-session
//! capture context, the scheduler state machine, and the interception hooks.

mod context;
mod interceptor;
mod plan;
mod scheduler;

pub use context::{CaptureContext, PendingCapture};
pub use interceptor::Interceptor;
pub use plan::{DmlKind, DmlTarget, StatementPlan};
pub use scheduler::CaptureScheduler;
