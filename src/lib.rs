// src/lib.rs

//! Incremental work-execution core for a build orchestration tool.
//!
//! Given a graph of interdependent units of work, this crate decides which
//! units must actually run based on prior execution history, executes them
//! in dependency order with chained transform support, and reports
//! execution-lifecycle events to an external observer safely under
//! concurrency.
//!
//! The pieces:
//! - [`changes`] diffs previous vs. current file-collection snapshots to
//!   decide whether a unit of work is up to date.
//! - [`graph`] models units of work (plain actions and artifact-transform
//!   chains) as nodes with dependency edges, and runs them in order.
//! - [`pipeline`] applies a sequence of decision stages (skip-if-disabled,
//!   up-to-date check, actual execution) to each plain node.
//! - [`ops`] raises each execution as a build operation and bridges the
//!   event stream to a single external listener, buffering and replaying
//!   events when the listener attaches late.
//!
//! Snapshot computation, dependency resolution and previous-state
//! persistence are external collaborators; this crate only consumes their
//! results.

pub mod changes;
pub mod errors;
pub mod graph;
pub mod logging;
pub mod ops;
pub mod pipeline;

pub use errors::{Failure, Result, WorkGraphError};
