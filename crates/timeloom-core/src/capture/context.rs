//! Per-session capture state.
//!
//! Each session owns exactly one `CaptureContext`; it is passed explicitly
//! through the hook chain, so sessions are isolated by construction and the
//! hook sequence is testable without ambient state.

/// A capture armed for a statement's mutation, awaiting flush at the next
/// statement boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCapture {
    pub table_name: String,
    pub pk_column: String,
    /// Version the flush will materialize.
    pub target_version: i64,
}

/// Session-scoped capture state. Holds at most one pending capture at a time
/// (single-statement DML assumption).
#[derive(Debug, Default)]
pub struct CaptureContext {
    pending: Option<PendingCapture>,
}

impl CaptureContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether no capture is pending.
    pub fn is_idle(&self) -> bool {
        self.pending.is_none()
    }

    /// The pending capture, if any.
    pub fn pending(&self) -> Option<&PendingCapture> {
        self.pending.as_ref()
    }

    /// Arm a capture. Any previously pending capture must have been flushed
    /// by the pre-hook before this is called.
    pub(crate) fn arm(&mut self, capture: PendingCapture) {
        debug_assert!(self.pending.is_none(), "arming over an unflushed capture");
        self.pending = Some(capture);
    }

    /// Take the pending capture, returning the context to idle.
    pub(crate) fn take(&mut self) -> Option<PendingCapture> {
        self.pending.take()
    }

    /// Drop a pending capture targeting `table`, if any. Used when tracking
    /// is disabled while a capture is outstanding; the history it would
    /// write is being dropped anyway.
    pub(crate) fn discard_for_table(&mut self, table: &str) {
        if self
            .pending
            .as_ref()
            .is_some_and(|p| p.table_name == table)
        {
            self.pending = None;
        }
    }
}
