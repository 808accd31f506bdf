//! Capture scheduler: the IDLE/PENDING state machine deciding when a
//! table's version counter advances and when the snapshot is materialized.
//!
//! Arm and flush always run at least one statement boundary apart, so a
//! flush for version V executes strictly after the mutation that produced V.

use crate::capture::{CaptureContext, PendingCapture};
use crate::engine::Engine;
use crate::error::TimeloomResult;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, warn};

/// Schedules version increments and snapshot flushes for one session.
pub struct CaptureScheduler {
    engine: Arc<Engine>,
}

impl CaptureScheduler {
    pub(crate) fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }

    /// IDLE → PENDING: increment the table's version counter and record the
    /// capture in the session context.
    pub(crate) fn arm(&self, ctx: &mut CaptureContext, table: &str) -> TimeloomResult<()> {
        let registry = self.engine.registry();
        let Some(tracked) = registry.lookup(table)? else {
            return Ok(());
        };

        let target_version = registry.bump_version(table)?;
        debug!(table, target_version, "capture armed");
        ctx.arm(PendingCapture {
            table_name: tracked.table_name,
            pk_column: tracked.pk_column,
            target_version,
        });
        Ok(())
    }

    /// PENDING → IDLE: materialize the pending capture into the history
    /// store, then clear it.
    ///
    /// A failed write discards the capture without surfacing an error to the
    /// statement that triggered the flush; the loss is counted in the
    /// engine's diagnostics.
    pub(crate) fn flush(&self, ctx: &mut CaptureContext) {
        let Some(pending) = ctx.take() else {
            return;
        };

        if let Err(e) = self.write_capture(&pending) {
            warn!(
                table = %pending.table_name,
                version = pending.target_version,
                error = %e,
                "flush failed; capture dropped"
            );
            self.engine.note_dropped_capture();
        } else {
            debug!(
                table = %pending.table_name,
                version = pending.target_version,
                "capture flushed"
            );
        }
    }

    fn write_capture(&self, pending: &PendingCapture) -> TimeloomResult<()> {
        let registry = self.engine.registry();
        let Some(tracked) = registry.lookup(&pending.table_name)? else {
            // Tracking was disabled between arm and flush; nothing to write.
            return Ok(());
        };

        let history = self.engine.history_store(&tracked)?;
        let captured_at = Utc::now().to_rfc3339();
        history.insert_snapshot(pending.target_version, &captured_at)?;
        history.insert_delete_markers(pending.target_version, &captured_at)?;
        Ok(())
    }
}
