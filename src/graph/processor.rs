// src/graph/processor.rs

//! Dependency-order execution of a work node set.
//!
//! The processor is the caller-side at-most-once guard: it expands the node
//! set via dependency resolution, orders it, and executes every node exactly
//! once. Independent nodes may be farmed out to worker threads by an
//! embedding scheduler; this processor keeps the reference semantics
//! deterministic by running ready nodes in the stable node order.

use std::collections::BTreeMap;
use std::sync::Arc;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::errors::{Result, WorkGraphError};
use crate::graph::node::{NodeKind, WorkNode, WorkResult};
use crate::graph::transform::DependencyResolver;
use crate::ops::BuildOperationExecutor;
use crate::pipeline::{ExecutionContext, ExecutionPipeline, TerminalOutcome, WorkState};

/// Outcome of one node as reported by [`WorkProcessor::run`].
#[derive(Debug)]
pub struct ExecutedWork {
    pub name: String,
    pub outcome: TerminalOutcome,
}

pub struct WorkProcessor<'a> {
    pipeline: &'a ExecutionPipeline,
    ops: &'a BuildOperationExecutor,
}

impl<'a> WorkProcessor<'a> {
    pub fn new(pipeline: &'a ExecutionPipeline, ops: &'a BuildOperationExecutor) -> Self {
        Self { pipeline, ops }
    }

    /// Expand `roots` into the full node set, order it by dependencies and
    /// execute each node exactly once, in order.
    ///
    /// Returns the per-node outcomes in execution order. A failed node does
    /// not abort the run: downstream transform nodes propagate the failure,
    /// downstream action nodes are blocked and record it.
    pub fn run(
        &self,
        roots: &[Arc<WorkNode>],
        resolver: &dyn DependencyResolver,
    ) -> Result<Vec<ExecutedWork>> {
        let nodes = discover(roots, resolver);
        check_for_cycles(&nodes)?;

        let mut remaining: Vec<Arc<WorkNode>> = nodes.into_values().collect();
        let mut report = Vec::new();

        while !remaining.is_empty() {
            // All dependencies terminal means ready; ties break on the
            // stable node order.
            let next = remaining
                .iter()
                .enumerate()
                .filter(|(_, node)| node.dependencies().iter().all(|dep| dep.is_terminal()))
                .min_by(|(_, a), (_, b)| a.compare(b))
                .map(|(index, _)| index);

            let Some(index) = next else {
                // Unreachable after the cycle check; kept as a hard error
                // rather than a hang.
                return Err(WorkGraphError::GraphCycle(
                    remaining[0].display_name().to_string(),
                ));
            };

            let node = remaining.swap_remove(index);
            let outcome = self.execute_node(&node)?;
            info!(node = %node.display_name(), %outcome, "work node finished");
            report.push(ExecutedWork {
                name: node.display_name().to_string(),
                outcome,
            });
        }

        Ok(report)
    }

    fn execute_node(&self, node: &Arc<WorkNode>) -> Result<TerminalOutcome> {
        // A failed dependency blocks an action node outright; transform
        // nodes handle predecessor failures themselves by propagating them.
        if matches!(node.kind(), NodeKind::Action { .. }) {
            for dep in node.dependencies() {
                if let Some(failure) = dep.failure()? {
                    debug!(
                        node = %node.display_name(),
                        dependency = %dep.display_name(),
                        "blocked by failed dependency"
                    );
                    node.complete(WorkResult::failed(failure.clone()))?;
                    return Ok(TerminalOutcome::Failed(failure));
                }
            }
        }

        let op = self.ops.start(
            &format!("execute {}", node.display_name()),
            Some(json!({ "work": node.display_name() })),
        );

        let outcome = match node.kind() {
            NodeKind::Action { work } => {
                let state = WorkState::new();
                let mut ctx = ExecutionContext::new();
                let outcome = self.pipeline.execute(work.as_ref(), &state, &mut ctx)?;
                match outcome.failure() {
                    Some(failure) => node.complete(WorkResult::failed(failure.clone()))?,
                    None => node.complete(WorkResult::success(Vec::new()))?,
                }
                outcome
            }
            NodeKind::InitialTransform { .. } | NodeKind::ChainedTransform { .. } => {
                node.execute(self.ops)?;
                match node.failure()? {
                    Some(failure) => TerminalOutcome::Failed(failure),
                    None => TerminalOutcome::Executed,
                }
            }
        };

        op.finish(
            Some(Value::String(outcome.to_string())),
            outcome.failure().cloned(),
        );
        Ok(outcome)
    }
}

/// Walk from the roots, resolving dependencies, until the node set is
/// closed. Keyed by creation order, which is unique per node.
fn discover(
    roots: &[Arc<WorkNode>],
    resolver: &dyn DependencyResolver,
) -> BTreeMap<u64, Arc<WorkNode>> {
    let mut nodes: BTreeMap<u64, Arc<WorkNode>> = BTreeMap::new();
    let mut worklist: Vec<Arc<WorkNode>> = roots.to_vec();

    while let Some(node) = worklist.pop() {
        if nodes.contains_key(&node.order()) {
            continue;
        }
        debug!(node = %node.display_name(), "discovered work node");
        let mut discovered = Vec::new();
        node.resolve_dependencies(resolver, &mut |dep| discovered.push(Arc::clone(dep)));
        nodes.insert(node.order(), node);
        worklist.extend(discovered);
    }

    nodes
}

fn check_for_cycles(nodes: &BTreeMap<u64, Arc<WorkNode>>) -> Result<()> {
    // Edge direction: dependency -> dependent. A topological sort fails
    // exactly when there is a cycle.
    let mut graph: DiGraphMap<u64, ()> = DiGraphMap::new();
    for order in nodes.keys() {
        graph.add_node(*order);
    }
    for node in nodes.values() {
        for dep in node.dependencies() {
            graph.add_edge(dep.order(), node.order(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => {
            let name = nodes
                .get(&cycle.node_id())
                .map(|n| n.display_name().to_string())
                .unwrap_or_default();
            Err(WorkGraphError::GraphCycle(name))
        }
    }
}
