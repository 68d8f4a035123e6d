// src/pipeline/skip_disabled.rs

//! Stage that skips units of work whose disabled predicate holds.

use std::sync::Arc;

use tracing::info;

use crate::errors::WorkGraphError;
use crate::pipeline::{ExecutionContext, ExecutionStage, StageResult, TerminalOutcome, UnitOfWork};

/// Skips the work when its disabled predicate evaluates to `true`.
///
/// The work is provisionally marked disabled before the predicate runs. A
/// predicate that fails to evaluate terminates the pipeline with a failure
/// outcome carrying the cause; the actual work never runs in that case.
pub struct SkipDisabledStage;

impl ExecutionStage for SkipDisabledStage {
    fn attempt(&self, work: &dyn UnitOfWork, _ctx: &mut ExecutionContext) -> StageResult {
        work.mark_disabled();

        let disabled = match work.is_disabled() {
            Ok(disabled) => disabled,
            Err(source) => {
                return StageResult::Done(TerminalOutcome::Failed(Arc::new(
                    WorkGraphError::DisabledPredicate {
                        work: work.display_name().to_string(),
                        source,
                    },
                )));
            }
        };

        if disabled {
            info!(work = %work.display_name(), "skipping disabled unit of work");
            return StageResult::Done(TerminalOutcome::Skipped);
        }

        StageResult::Continue
    }
}
