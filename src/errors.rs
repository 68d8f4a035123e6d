// src/errors.rs

//! Crate-wide error types and helpers.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// A failure shared between work nodes and notifications.
///
/// A chained transform node propagates its predecessor's failure verbatim,
/// and the notification bridge hands the same failure to the listener, so
/// failures are reference-counted rather than cloned.
pub type Failure = Arc<WorkGraphError>;

#[derive(Error, Debug)]
pub enum WorkGraphError {
    /// Evaluating the enablement predicate of a unit of work threw.
    #[error("could not evaluate the disabled predicate for {work}")]
    DisabledPredicate {
        work: String,
        #[source]
        source: anyhow::Error,
    },

    /// Artifact resolution produced more than one underlying failure.
    ///
    /// Single-cause resolution failures are propagated as-is instead.
    #[error("failed to resolve {what} ({} underlying failures)", causes.len())]
    ResolveFailed { what: String, causes: Vec<Failure> },

    /// A transform function failed for one of its input files.
    #[error("transform '{transform}' failed for input {input:?}")]
    TransformFailed {
        transform: String,
        input: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    /// `transform_chain` was called with an empty step sequence.
    #[error("a transform chain requires at least one transform step")]
    EmptyChain,

    #[error("cycle detected in work graph involving '{0}'")]
    GraphCycle(String),

    /// Result or failure of a node was queried before it reached a terminal
    /// state.
    #[error("work node '{0}' has not been executed yet")]
    NotExecuted(String),

    /// Misuse of the crate by the embedding system (double start of the
    /// bridge, double listener registration, re-executing a terminal node).
    /// These are programmer errors, never retried.
    #[error("protocol misuse: {0}")]
    Protocol(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl WorkGraphError {
    pub(crate) fn protocol(msg: impl Into<String>) -> Self {
        WorkGraphError::Protocol(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, WorkGraphError>;
