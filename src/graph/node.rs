// src/graph/node.rs

//! Work nodes: the schedulable units of the execution graph.

use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use crate::errors::{Failure, Result, WorkGraphError};
use crate::graph::transform::{ArtifactSet, DependencyResolver, TransformStep};
use crate::pipeline::UnitOfWork;

/// Creation order is global and monotonic; it is only ever used as a
/// deterministic tie-break, never as a business identifier.
static ORDER_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Variant-specific part of a [`WorkNode`].
pub enum NodeKind {
    /// A plain unit of work with no chaining; executed through the
    /// execution pipeline.
    Action { work: Box<dyn UnitOfWork> },
    /// First step of a transform chain: resolves its artifact set, then
    /// applies its transform to the resolved artifact.
    InitialTransform {
        step: TransformStep,
        artifact: Arc<dyn ArtifactSet>,
    },
    /// A later step of a transform chain: applies its transform to each
    /// file produced by the predecessor.
    ChainedTransform {
        step: TransformStep,
        previous: Arc<WorkNode>,
    },
}

impl NodeKind {
    /// Stable ordering rank across variants, following the lexicographic
    /// order of the variant names: action, chained-transform,
    /// initial-transform.
    fn rank(&self) -> u8 {
        match self {
            NodeKind::Action { .. } => 0,
            NodeKind::ChainedTransform { .. } => 1,
            NodeKind::InitialTransform { .. } => 2,
        }
    }

    fn kind_name(&self) -> &'static str {
        match self {
            NodeKind::Action { .. } => "action",
            NodeKind::InitialTransform { .. } => "initial-transform",
            NodeKind::ChainedTransform { .. } => "chained-transform",
        }
    }
}

/// Terminal result of one node's execution.
///
/// Plain action nodes record no files; transform nodes record the files
/// their transform produced. A failed node always records empty output with
/// the failure attached.
#[derive(Debug, Clone)]
pub struct WorkResult {
    files: Vec<PathBuf>,
    failure: Option<Failure>,
}

impl WorkResult {
    pub fn success(files: Vec<PathBuf>) -> Self {
        Self {
            files,
            failure: None,
        }
    }

    pub fn failed(failure: Failure) -> Self {
        Self {
            files: Vec::new(),
            failure: Some(failure),
        }
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn failure(&self) -> Option<&Failure> {
        self.failure.as_ref()
    }
}

/// One schedulable unit in the execution graph.
///
/// The graph owns all nodes for the duration of one build; nodes are never
/// shared across builds. A node's result is set exactly once; at-most-once
/// *execution* is enforced by the processor, not assumed by the node.
pub struct WorkNode {
    order: u64,
    display_name: String,
    kind: NodeKind,
    result: OnceLock<WorkResult>,
    successors: Mutex<Vec<Arc<WorkNode>>>,
}

impl WorkNode {
    fn new(display_name: String, kind: NodeKind) -> Arc<Self> {
        Arc::new(Self {
            order: ORDER_COUNTER.fetch_add(1, AtomicOrdering::Relaxed),
            display_name,
            kind,
            result: OnceLock::new(),
            successors: Mutex::new(Vec::new()),
        })
    }

    /// Create a plain node wrapping a unit of work.
    pub fn new_action(work: Box<dyn UnitOfWork>) -> Arc<Self> {
        let name = work.display_name().to_string();
        Self::new(name, NodeKind::Action { work })
    }

    pub(crate) fn new_initial_transform(
        step: TransformStep,
        artifact: Arc<dyn ArtifactSet>,
    ) -> Arc<Self> {
        let name = format!("{} of {}", step.name(), artifact.display_name());
        Self::new(name, NodeKind::InitialTransform { step, artifact })
    }

    pub(crate) fn new_chained_transform(step: TransformStep, previous: Arc<WorkNode>) -> Arc<Self> {
        let name = format!("{} of {}", step.name(), previous.display_name());
        Self::new(name, NodeKind::ChainedTransform { step, previous })
    }

    pub fn order(&self) -> u64 {
        self.order
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Record a dependency edge to a node that must reach a terminal state
    /// before this one runs.
    pub fn add_dependency(&self, dependency: &Arc<WorkNode>) {
        let mut successors = self.successors.lock();
        if !successors.iter().any(|d| d.order == dependency.order) {
            successors.push(Arc::clone(dependency));
        }
    }

    /// Direct dependencies, in the stable node order.
    pub fn dependencies(&self) -> Vec<Arc<WorkNode>> {
        let mut deps = self.successors.lock().clone();
        deps.sort_by(|a, b| a.compare(b));
        deps
    }

    /// Expand this node's hard dependencies.
    ///
    /// For an initial transform node the resolver maps the artifact set's
    /// build dependencies to work nodes; for a chained node the sole
    /// dependency is its predecessor; plain nodes only carry explicitly
    /// added edges. Each discovered dependency is recorded as an edge and
    /// passed to `on_hard_successor`.
    pub fn resolve_dependencies(
        &self,
        resolver: &dyn DependencyResolver,
        on_hard_successor: &mut dyn FnMut(&Arc<WorkNode>),
    ) {
        match &self.kind {
            NodeKind::Action { .. } => {
                for dependency in self.dependencies() {
                    on_hard_successor(&dependency);
                }
            }
            NodeKind::InitialTransform { artifact, .. } => {
                for dependency in resolver.resolve_build_dependencies(artifact.as_ref()) {
                    self.add_dependency(&dependency);
                    on_hard_successor(&dependency);
                }
            }
            NodeKind::ChainedTransform { previous, .. } => {
                self.add_dependency(previous);
                on_hard_successor(previous);
            }
        }
    }

    /// Stable ordering: unequal variants order by kind, equal variants by
    /// creation order. A deterministic tie-break for graph algorithms; the
    /// primary scheduling order is dependency order.
    pub fn compare(&self, other: &WorkNode) -> Ordering {
        self.kind
            .rank()
            .cmp(&other.kind.rank())
            .then(self.order.cmp(&other.order))
    }

    pub(crate) fn complete(&self, result: WorkResult) -> Result<()> {
        self.result.set(result).map_err(|_| {
            WorkGraphError::protocol(format!(
                "work node '{}' was executed more than once",
                self.display_name
            ))
        })
    }

    /// Whether the node has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.result.get().is_some()
    }

    /// The node's terminal result. Errors if the node has not executed yet;
    /// returns the identical value on every call afterwards.
    pub fn result(&self) -> Result<&WorkResult> {
        self.result
            .get()
            .ok_or_else(|| WorkGraphError::NotExecuted(self.display_name.clone()))
    }

    /// The node's failure, if any. Errors if the node has not executed yet.
    pub fn failure(&self) -> Result<Option<Failure>> {
        Ok(self.result()?.failure().cloned())
    }

    /// The files produced by the node. Errors if the node has not executed
    /// yet or has failed.
    pub fn files(&self) -> Result<&[PathBuf]> {
        let result = self.result()?;
        if result.failure().is_some() {
            return Err(WorkGraphError::protocol(format!(
                "work node '{}' has failed; its output cannot be queried",
                self.display_name
            )));
        }
        Ok(result.files())
    }
}

impl fmt::Debug for WorkNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkNode")
            .field("order", &self.order)
            .field("kind", &self.kind.kind_name())
            .field("display_name", &self.display_name)
            .field("terminal", &self.is_terminal())
            .finish()
    }
}
