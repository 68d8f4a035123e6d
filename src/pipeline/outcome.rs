// src/pipeline/outcome.rs

//! Terminal outcomes and the set-once outcome holder.

use std::fmt;
use std::sync::OnceLock;

use crate::errors::{Failure, Result, WorkGraphError};

/// Terminal result of one pipeline invocation for a unit of work.
#[derive(Debug, Clone)]
pub enum TerminalOutcome {
    /// The work ran to completion.
    Executed,
    /// The work was disabled and skipped.
    Skipped,
    /// No changes since the previous execution; the work did not run.
    UpToDate,
    /// The work (or a decision stage) failed.
    Failed(Failure),
}

impl TerminalOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, TerminalOutcome::Failed(_))
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            TerminalOutcome::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}

impl PartialEq for TerminalOutcome {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (TerminalOutcome::Executed, TerminalOutcome::Executed) => true,
            (TerminalOutcome::Skipped, TerminalOutcome::Skipped) => true,
            (TerminalOutcome::UpToDate, TerminalOutcome::UpToDate) => true,
            // Failures compare by identity; the same failure is shared, not
            // cloned, across the system.
            (TerminalOutcome::Failed(a), TerminalOutcome::Failed(b)) => std::sync::Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for TerminalOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TerminalOutcome::Executed => "EXECUTED",
            TerminalOutcome::Skipped => "SKIPPED",
            TerminalOutcome::UpToDate => "UP-TO-DATE",
            TerminalOutcome::Failed(_) => "FAILED",
        };
        f.write_str(label)
    }
}

/// Set-once holder for a unit of work's terminal outcome.
///
/// The transition from "not yet run" to a terminal outcome is
/// one-directional and happens exactly once; re-querying afterwards returns
/// the same value on every call.
#[derive(Debug, Default)]
pub struct WorkState {
    outcome: OnceLock<TerminalOutcome>,
}

impl WorkState {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set(&self, outcome: TerminalOutcome) -> Result<()> {
        self.outcome
            .set(outcome)
            .map_err(|_| WorkGraphError::protocol("work already has a terminal outcome"))
    }

    pub fn outcome(&self) -> Option<&TerminalOutcome> {
        self.outcome.get()
    }
}
