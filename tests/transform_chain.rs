mod common;

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::anyhow;
use workgraph::graph::{transform_chain, NodeKind, TransformStep, WorkNode};
use workgraph::ops::{BuildOperationExecutor, NotificationBridge};
use workgraph::WorkGraphError;
use workgraph_test_utils::fakes::FixedArtifactSet;

/// Executor whose events go nowhere (the bridge valve stays closed).
fn silent_ops() -> BuildOperationExecutor {
    BuildOperationExecutor::new(Arc::new(NotificationBridge::new()))
}

fn suffixing(name: &str) -> TransformStep {
    let suffix = format!(".{name}");
    TransformStep::new(name, move |input: &std::path::Path| {
        let mut path = input.as_os_str().to_os_string();
        path.push(&suffix);
        Ok(vec![PathBuf::from(path)])
    })
}

fn run_chain(chain: &Arc<WorkNode>, ops: &BuildOperationExecutor) {
    // Bottom-up: predecessors before dependents.
    let mut stack = vec![Arc::clone(chain)];
    let mut order = Vec::new();
    while let Some(node) = stack.pop() {
        if let NodeKind::ChainedTransform { previous, .. } = node.kind() {
            stack.push(Arc::clone(previous));
        }
        order.push(node);
    }
    for node in order.into_iter().rev() {
        node.execute(ops).unwrap();
    }
}

#[test]
fn empty_chain_is_rejected() {
    let artifact = Arc::new(FixedArtifactSet::resolving_to("lib", "lib.jar"));
    let err = transform_chain(Vec::new(), artifact).unwrap_err();
    assert!(matches!(err, WorkGraphError::EmptyChain));
}

#[test]
fn single_step_chain_resolves_then_transforms() {
    common::init_tracing();
    let artifact = Arc::new(FixedArtifactSet::resolving_to("lib", "lib.jar"));
    let chain = transform_chain(vec![suffixing("unzip")], artifact).unwrap();

    assert_eq!(chain.display_name(), "unzip of lib");
    assert!(!chain.is_terminal());

    chain.execute(&silent_ops()).unwrap();
    assert_eq!(chain.files().unwrap(), &[PathBuf::from("lib.jar.unzip")]);
}

#[test]
fn chained_steps_apply_in_order() {
    let artifact = Arc::new(FixedArtifactSet::resolving_to("lib", "lib.jar"));
    let chain = transform_chain(vec![suffixing("a"), suffixing("b")], artifact).unwrap();

    assert_eq!(chain.display_name(), "b of a of lib");
    run_chain(&chain, &silent_ops());
    assert_eq!(chain.files().unwrap(), &[PathBuf::from("lib.jar.a.b")]);
}

#[test]
fn chained_step_transforms_every_predecessor_file_in_output_order() {
    let artifact = Arc::new(FixedArtifactSet::resolving_to("lib", "lib.jar"));
    let split = TransformStep::new("split", |_input: &std::path::Path| {
        Ok(vec![PathBuf::from("one"), PathBuf::from("two")])
    });
    let chain = transform_chain(vec![split, suffixing("mark")], artifact).unwrap();

    run_chain(&chain, &silent_ops());
    assert_eq!(
        chain.files().unwrap(),
        &[PathBuf::from("one.mark"), PathBuf::from("two.mark")]
    );
}

#[test]
fn mid_chain_failure_propagates_verbatim_and_skips_later_transforms() {
    let artifact = Arc::new(FixedArtifactSet::resolving_to("lib", "lib.jar"));
    let invoked = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&invoked);

    let failing = TransformStep::new("explode", |_input: &std::path::Path| {
        Err(anyhow!("corrupt archive"))
    });
    let never = TransformStep::new("never", move |_input: &std::path::Path| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(vec![])
    });

    let chain = transform_chain(vec![suffixing("a"), failing, never], artifact).unwrap();
    run_chain(&chain, &silent_ops());

    // The transform after the failure was never invoked.
    assert_eq!(invoked.load(Ordering::SeqCst), 0);

    // All downstream nodes share the identical failure.
    let NodeKind::ChainedTransform { previous, .. } = chain.kind() else {
        panic!("expected a chained node");
    };
    let original = previous.failure().unwrap().expect("middle node failed");
    let propagated = chain.failure().unwrap().expect("tail node failed");
    assert!(Arc::ptr_eq(&original, &propagated));
    assert!(matches!(
        original.as_ref(),
        WorkGraphError::TransformFailed { transform, .. } if transform == "explode"
    ));
}

#[test]
fn single_resolve_failure_is_propagated_as_is() {
    let cause = Arc::new(WorkGraphError::Other(anyhow!("repository unreachable")));
    let artifact = Arc::new(FixedArtifactSet::failing_with("lib", vec![Arc::clone(&cause)]));
    let chain = transform_chain(vec![suffixing("a")], artifact).unwrap();

    chain.execute(&silent_ops()).unwrap();
    let failure = chain.failure().unwrap().expect("resolution failed");
    assert!(Arc::ptr_eq(&failure, &cause));
}

#[test]
fn multiple_resolve_failures_are_aggregated() {
    let causes = vec![
        Arc::new(WorkGraphError::Other(anyhow!("first"))),
        Arc::new(WorkGraphError::Other(anyhow!("second"))),
    ];
    let artifact = Arc::new(FixedArtifactSet::failing_with("lib", causes));
    let chain = transform_chain(vec![suffixing("a")], artifact).unwrap();

    chain.execute(&silent_ops()).unwrap();
    let failure = chain.failure().unwrap().expect("resolution failed");
    match failure.as_ref() {
        WorkGraphError::ResolveFailed { what, causes } => {
            assert_eq!(what, "artifacts for a");
            assert_eq!(causes.len(), 2);
        }
        other => panic!("unexpected failure: {other}"),
    }
}

#[test]
fn querying_before_execution_errors() {
    let artifact = Arc::new(FixedArtifactSet::resolving_to("lib", "lib.jar"));
    let chain = transform_chain(vec![suffixing("a"), suffixing("b")], artifact).unwrap();

    assert!(matches!(
        chain.files().unwrap_err(),
        WorkGraphError::NotExecuted(_)
    ));

    // Executing the tail before its predecessor is the same error.
    assert!(matches!(
        chain.execute(&silent_ops()).unwrap_err(),
        WorkGraphError::NotExecuted(_)
    ));
}

#[test]
fn result_is_idempotent_after_execution() {
    let artifact = Arc::new(FixedArtifactSet::resolving_to("lib", "lib.jar"));
    let chain = transform_chain(vec![suffixing("a")], artifact).unwrap();
    chain.execute(&silent_ops()).unwrap();

    let first: Vec<PathBuf> = chain.files().unwrap().to_vec();
    let second: Vec<PathBuf> = chain.files().unwrap().to_vec();
    assert_eq!(first, second);
}

#[test]
fn re_executing_a_terminal_node_is_a_protocol_error() {
    let artifact = Arc::new(FixedArtifactSet::resolving_to("lib", "lib.jar"));
    let chain = transform_chain(vec![suffixing("a")], artifact).unwrap();
    let ops = silent_ops();
    chain.execute(&ops).unwrap();

    assert!(matches!(
        chain.execute(&ops).unwrap_err(),
        WorkGraphError::Protocol(_)
    ));
}

#[test]
fn querying_files_of_a_failed_node_is_a_protocol_error() {
    let artifact = Arc::new(FixedArtifactSet::failing_with(
        "lib",
        vec![Arc::new(WorkGraphError::Other(anyhow!("nope")))],
    ));
    let chain = transform_chain(vec![suffixing("a")], artifact).unwrap();
    chain.execute(&silent_ops()).unwrap();

    assert!(matches!(
        chain.files().unwrap_err(),
        WorkGraphError::Protocol(_)
    ));
}

#[test]
fn nodes_order_by_kind_then_creation_order() {
    let a1 = Arc::new(FixedArtifactSet::resolving_to("a1", "a1"));
    let a2 = Arc::new(FixedArtifactSet::resolving_to("a2", "a2"));
    let first = transform_chain(vec![suffixing("x"), suffixing("y")], a1).unwrap();
    let second = transform_chain(vec![suffixing("x")], a2).unwrap();

    let NodeKind::ChainedTransform { previous: first_initial, .. } = first.kind() else {
        panic!("expected a chained node");
    };

    // Chained nodes precede initial nodes even when created later.
    assert!(first.order() > first_initial.order());
    assert_eq!(
        first.compare(first_initial),
        std::cmp::Ordering::Less,
        "chained before initial"
    );
    // Within a kind, creation order decides.
    assert_eq!(
        first_initial.compare(&second),
        std::cmp::Ordering::Less,
        "older initial first"
    );
}
