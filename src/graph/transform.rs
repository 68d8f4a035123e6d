// src/graph/transform.rs

//! Transform chains: construction and execution.
//!
//! A chain applies an ordered sequence of transform steps to an initially
//! unresolved artifact. The first (initial) node resolves the artifact set
//! as a blocking sub-operation and transforms the resolved artifact; each
//! later (chained) node transforms every file its predecessor produced, in
//! predecessor-output order. The first failing step is definitive: it is
//! propagated verbatim to all downstream nodes without invoking their
//! transform functions.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::anyhow;
use serde_json::json;
use tracing::debug;

use crate::errors::{Failure, Result, WorkGraphError};
use crate::graph::node::{NodeKind, WorkNode, WorkResult};
use crate::ops::{BuildOperationExecutor, OperationQueue};

/// One step of a transform chain: a display name plus the transform
/// function, mapping one input file to a sequence of output files.
pub struct TransformStep {
    name: String,
    #[allow(clippy::type_complexity)]
    func: Box<dyn Fn(&Path) -> anyhow::Result<Vec<PathBuf>> + Send + Sync>,
}

impl TransformStep {
    pub fn new(
        name: impl Into<String>,
        func: impl Fn(&Path) -> anyhow::Result<Vec<PathBuf>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            func: Box::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, input: &Path) -> Result<Vec<PathBuf>> {
        (self.func)(input).map_err(|source| WorkGraphError::TransformFailed {
            transform: self.name.clone(),
            input: input.to_path_buf(),
            source,
        })
    }
}

impl fmt::Debug for TransformStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformStep")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// An artifact delivered by the resolution collaborator.
#[derive(Debug, Clone)]
pub struct ResolvedArtifact {
    pub id: String,
    pub file: PathBuf,
}

/// Visitor over the outcome of an artifact resolution.
pub trait ArtifactVisitor {
    fn artifact(&mut self, artifact: &ResolvedArtifact);
    fn failure(&mut self, failure: &Failure);
}

/// Handle for an in-flight resolution; visitable once the queued resolution
/// operations have run.
pub trait ResolveCompletion: Send {
    fn visit(&mut self, visitor: &mut dyn ArtifactVisitor);
}

/// An opaque, lazily resolved artifact set (external collaborator).
///
/// `start_visit` enqueues whatever operations the resolution needs; the
/// returned completion yields the resolved artifact or the failures once
/// those operations have run.
pub trait ArtifactSet: Send + Sync {
    fn display_name(&self) -> &str;
    fn start_visit(&self, queue: &mut OperationQueue<'_>) -> Box<dyn ResolveCompletion>;
}

/// Maps an artifact set's build dependencies to the work nodes that produce
/// them (external collaborator).
pub trait DependencyResolver {
    fn resolve_build_dependencies(&self, artifact: &dyn ArtifactSet) -> Vec<Arc<WorkNode>>;
}

/// Build a chain of transform nodes over `artifact`, one node per step,
/// each wrapping the previous. Returns the terminal node of the chain.
pub fn transform_chain(
    steps: Vec<TransformStep>,
    artifact: Arc<dyn ArtifactSet>,
) -> Result<Arc<WorkNode>> {
    let mut steps = steps.into_iter();
    let first = steps.next().ok_or(WorkGraphError::EmptyChain)?;
    let mut current = WorkNode::new_initial_transform(first, artifact);
    for step in steps {
        current = WorkNode::new_chained_transform(step, current);
    }
    Ok(current)
}

#[derive(Default)]
struct CollectingArtifactVisitor {
    artifacts: Vec<ResolvedArtifact>,
    failures: Vec<Failure>,
}

impl ArtifactVisitor for CollectingArtifactVisitor {
    fn artifact(&mut self, artifact: &ResolvedArtifact) {
        self.artifacts.push(artifact.clone());
    }

    fn failure(&mut self, failure: &Failure) {
        self.failures.push(failure.clone());
    }
}

impl WorkNode {
    /// Execute a transform node, recording its terminal result exactly once.
    ///
    /// Plain action nodes are executed through the pipeline instead; calling
    /// this on one is a protocol error, as is re-executing an already
    /// terminal node.
    pub fn execute(&self, ops: &BuildOperationExecutor) -> Result<()> {
        if self.is_terminal() {
            return Err(WorkGraphError::protocol(format!(
                "work node '{}' was executed more than once",
                self.display_name()
            )));
        }
        match self.kind() {
            NodeKind::Action { .. } => Err(WorkGraphError::protocol(format!(
                "plain work node '{}' must be executed through the pipeline",
                self.display_name()
            ))),
            NodeKind::InitialTransform { step, artifact } => {
                self.execute_initial(step, artifact.as_ref(), ops)
            }
            NodeKind::ChainedTransform { step, previous } => {
                self.execute_chained(step, previous, ops)
            }
        }
    }

    fn execute_initial(
        &self,
        step: &TransformStep,
        artifact: &dyn ArtifactSet,
        ops: &BuildOperationExecutor,
    ) -> Result<()> {
        // Resolution is a blocking sub-operation of this node's execution.
        let mut completion = ops.run_all(&format!("resolve {}", artifact.display_name()), |queue| {
            artifact.start_visit(queue)
        });

        let mut collector = CollectingArtifactVisitor::default();
        completion.visit(&mut collector);

        if !collector.failures.is_empty() {
            // A single cause is propagated as-is; multiple causes are
            // wrapped into one aggregate resolve failure.
            let failure = if collector.failures.len() == 1 {
                collector.failures.remove(0)
            } else {
                Arc::new(WorkGraphError::ResolveFailed {
                    what: format!("artifacts for {}", step.name()),
                    causes: collector.failures,
                })
            };
            debug!(node = %self.display_name(), "artifact resolution failed");
            return self.complete(WorkResult::failed(failure));
        }

        let artifact = match collector.artifacts.as_slice() {
            [single] => single.clone(),
            other => {
                let failure = Arc::new(WorkGraphError::Other(anyhow!(
                    "expected exactly one resolved artifact for '{}', got {}",
                    step.name(),
                    other.len()
                )));
                return self.complete(WorkResult::failed(failure));
            }
        };

        let outcome = ops.run(
            &format!("transform artifact {} with {}", artifact.id, step.name()),
            Some(json!({ "transform": step.name(), "artifact": artifact.id })),
            || step.apply(&artifact.file),
        );
        match outcome {
            Ok(files) => self.complete(WorkResult::success(files)),
            Err(failure) => self.complete(WorkResult::failed(failure)),
        }
    }

    fn execute_chained(
        &self,
        step: &TransformStep,
        previous: &Arc<WorkNode>,
        ops: &BuildOperationExecutor,
    ) -> Result<()> {
        // The predecessor must already be terminal; its failure is
        // propagated verbatim without invoking this node's transform.
        if let Some(failure) = previous.failure()? {
            debug!(
                node = %self.display_name(),
                predecessor = %previous.display_name(),
                "propagating predecessor failure"
            );
            return self.complete(WorkResult::failed(failure));
        }

        let inputs: Vec<PathBuf> = previous.files()?.to_vec();
        let mut outputs = Vec::new();
        for input in inputs {
            let outcome = ops.run(
                &format!("transform file {} with {}", input.display(), step.name()),
                Some(json!({ "transform": step.name(), "input": input.display().to_string() })),
                || step.apply(&input),
            );
            match outcome {
                Ok(files) => outputs.extend(files),
                Err(failure) => return self.complete(WorkResult::failed(failure)),
            }
        }
        self.complete(WorkResult::success(outputs))
    }
}
