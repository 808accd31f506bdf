//! DML interceptor: the pair of hooks the statement pipeline invokes around
//! plan optimization.

use crate::capture::{CaptureContext, CaptureScheduler, StatementPlan};
use crate::engine::Engine;
use crate::error::TimeloomResult;
use std::sync::Arc;

/// Inspects statement plans and drives the capture scheduler.
pub struct Interceptor {
    engine: Arc<Engine>,
    scheduler: CaptureScheduler,
}

impl Interceptor {
    pub(crate) fn new(engine: Arc<Engine>) -> Self {
        let scheduler = CaptureScheduler::new(Arc::clone(&engine));
        Self { engine, scheduler }
    }

    pub(crate) fn scheduler(&self) -> &CaptureScheduler {
        &self.scheduler
    }

    /// Pre-optimization hook.
    ///
    /// Flushes any capture left pending by a previous statement (its
    /// mutation has executed by now), then scans the current plan and arms a
    /// capture for the first DML node that targets a tracked table.
    ///
    /// Limitation: at most one table is armed per statement. A statement
    /// mutating several tracked tables loses history for all but the first
    /// detected one.
    pub(crate) fn pre_hook(
        &self,
        ctx: &mut CaptureContext,
        plan: &StatementPlan,
    ) -> TimeloomResult<()> {
        self.scheduler.flush(ctx);

        for target in plan.dml_targets() {
            if self.engine.config().is_engine_table(&target.table) {
                continue;
            }
            if self.engine.registry().lookup(&target.table)?.is_some() {
                self.scheduler.arm(ctx, &target.table)?;
                break;
            }
        }
        Ok(())
    }

    /// Post-optimization hook.
    ///
    /// Runs before the statement executes. If the plan still contains DML
    /// against a tracked table, the mutation has not happened yet and
    /// flushing would capture the pre-mutation state, so nothing is done.
    /// For plans with no tracked DML it is safe to flush whatever is still
    /// outstanding.
    pub(crate) fn post_hook(&self, ctx: &mut CaptureContext, plan: &StatementPlan) -> TimeloomResult<()> {
        if self.plan_mutates_tracked_table(plan)? {
            return Ok(());
        }
        self.scheduler.flush(ctx);
        Ok(())
    }

    fn plan_mutates_tracked_table(&self, plan: &StatementPlan) -> TimeloomResult<bool> {
        for target in plan.dml_targets() {
            if self.engine.config().is_engine_table(&target.table) {
                continue;
            }
            if self.engine.registry().lookup(&target.table)?.is_some() {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
