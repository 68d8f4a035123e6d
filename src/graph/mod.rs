// src/graph/mod.rs

//! The work node graph.
//!
//! - [`node`] defines the schedulable work-node type: plain action nodes and
//!   the two transform-chain variants, with creation-order tie-breaking and
//!   set-once results.
//! - [`transform`] builds transform chains, resolves their dependencies and
//!   executes them, including artifact resolution for the initial step.
//! - [`processor`] expands a node set, orders it by dependencies and runs
//!   each node exactly once, raising build operations along the way.

pub mod node;
pub mod processor;
pub mod transform;

pub use node::{NodeKind, WorkNode, WorkResult};
pub use processor::{ExecutedWork, WorkProcessor};
pub use transform::{
    transform_chain, ArtifactSet, ArtifactVisitor, DependencyResolver, ResolveCompletion,
    ResolvedArtifact, TransformStep,
};
