// src/pipeline/mod.rs

//! Execution pipeline for plain units of work.
//!
//! A fixed, ordered sequence of decision stages runs before the real action:
//! each stage either sets the terminal outcome (short-circuiting the rest of
//! the pipeline) or passes control on. The terminal "do the work" stage is
//! built in; exactly one outcome is produced per invocation, and an outcome
//! is never overwritten once set.

use std::sync::Arc;

use crate::changes::PropertyChangeSet;
use crate::errors::{Result, WorkGraphError};

pub mod outcome;
pub mod skip_disabled;
pub mod up_to_date;

pub use outcome::{TerminalOutcome, WorkState};
pub use skip_disabled::SkipDisabledStage;
pub use up_to_date::UpToDateStage;

/// One unit of plain (non-transform) work as seen by the pipeline.
pub trait UnitOfWork: Send + Sync {
    fn display_name(&self) -> &str;

    /// Provisionally mark the work disabled before its predicate runs.
    fn mark_disabled(&self);

    /// Evaluate the enablement predicate; `Ok(true)` means the work is
    /// disabled and must be skipped. Evaluation may fail.
    fn is_disabled(&self) -> anyhow::Result<bool>;

    /// Run the actual work.
    fn execute(&self) -> anyhow::Result<()>;

    /// Per-property snapshots recorded by the previous execution, if any.
    fn previous_state(&self) -> Option<&PropertyChangeSet>;

    /// Per-property snapshots of the current state.
    fn current_state(&self) -> &PropertyChangeSet;
}

// Lets a caller keep a handle on the work after handing ownership to a node.
impl<T: UnitOfWork + ?Sized> UnitOfWork for Arc<T> {
    fn display_name(&self) -> &str {
        self.as_ref().display_name()
    }

    fn mark_disabled(&self) {
        self.as_ref().mark_disabled();
    }

    fn is_disabled(&self) -> anyhow::Result<bool> {
        self.as_ref().is_disabled()
    }

    fn execute(&self) -> anyhow::Result<()> {
        self.as_ref().execute()
    }

    fn previous_state(&self) -> Option<&PropertyChangeSet> {
        self.as_ref().previous_state()
    }

    fn current_state(&self) -> &PropertyChangeSet {
        self.as_ref().current_state()
    }
}

/// Decision of one pipeline stage.
pub enum StageResult {
    /// Pass control to the next stage.
    Continue,
    /// Terminal outcome reached; no further stage runs.
    Done(TerminalOutcome),
}

pub trait ExecutionStage: Send + Sync {
    fn attempt(&self, work: &dyn UnitOfWork, ctx: &mut ExecutionContext) -> StageResult;
}

/// Per-invocation scratch state shared between stages.
#[derive(Debug, Default)]
pub struct ExecutionContext {
    /// Messages describing why the work was found out of date.
    pub out_of_date_messages: Vec<String>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }
}

/// An ordered list of decision stages wrapping the terminal action stage.
pub struct ExecutionPipeline {
    stages: Vec<Box<dyn ExecutionStage>>,
}

impl ExecutionPipeline {
    /// The standard stage order: skip-if-disabled, then the up-to-date
    /// check.
    pub fn standard() -> Self {
        Self::with_stages(vec![
            Box::new(SkipDisabledStage),
            Box::new(UpToDateStage::new(true)),
        ])
    }

    pub fn with_stages(stages: Vec<Box<dyn ExecutionStage>>) -> Self {
        Self { stages }
    }

    /// Apply the stages to `work` and record the terminal outcome in
    /// `state`.
    ///
    /// Errors only on protocol misuse (the work already has an outcome);
    /// failures of the work itself are a normal [`TerminalOutcome::Failed`].
    pub fn execute(
        &self,
        work: &dyn UnitOfWork,
        state: &WorkState,
        ctx: &mut ExecutionContext,
    ) -> Result<TerminalOutcome> {
        let mut outcome = None;
        for stage in &self.stages {
            if let StageResult::Done(done) = stage.attempt(work, ctx) {
                outcome = Some(done);
                break;
            }
        }

        let outcome = outcome.unwrap_or_else(|| match work.execute() {
            Ok(()) => TerminalOutcome::Executed,
            Err(source) => TerminalOutcome::Failed(Arc::new(WorkGraphError::Other(source))),
        });

        state.set(outcome.clone())?;
        Ok(outcome)
    }
}
