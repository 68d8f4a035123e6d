// src/pipeline/up_to_date.rs

//! Stage that skips work whose inputs have not changed since the previous
//! execution.

use tracing::{debug, info};

use crate::changes::{visit_state_changes, CollectingChangeVisitor};
use crate::pipeline::{ExecutionContext, ExecutionStage, StageResult, TerminalOutcome, UnitOfWork};

/// How many out-of-date reasons are collected before the diff aborts early.
/// One changed file is already enough to decide "must re-run".
const MAX_REPORTED_CHANGES: usize = 3;

/// Consults the change detector with the previous and current property
/// change sets; when no change is visited, the work is up to date and does
/// not run.
pub struct UpToDateStage {
    include_added: bool,
}

impl UpToDateStage {
    /// `include_added = false` suppresses purely-added files as re-run
    /// triggers (used for output-only comparisons).
    pub fn new(include_added: bool) -> Self {
        Self { include_added }
    }
}

impl ExecutionStage for UpToDateStage {
    fn attempt(&self, work: &dyn UnitOfWork, ctx: &mut ExecutionContext) -> StageResult {
        let Some(previous) = work.previous_state() else {
            debug!(work = %work.display_name(), "no previous execution state; work must run");
            return StageResult::Continue;
        };

        let mut visitor = CollectingChangeVisitor::new(MAX_REPORTED_CHANGES);
        visit_state_changes(
            work.display_name(),
            previous,
            work.current_state(),
            self.include_added,
            &mut visitor,
        );

        if !visitor.has_changes() {
            info!(work = %work.display_name(), "skipping as up to date");
            return StageResult::Done(TerminalOutcome::UpToDate);
        }

        let messages = visitor.into_messages();
        for message in &messages {
            debug!(work = %work.display_name(), "{message}");
        }
        ctx.out_of_date_messages = messages;
        StageResult::Continue
    }
}
