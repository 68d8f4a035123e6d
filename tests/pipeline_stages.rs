mod common;

use workgraph::pipeline::{ExecutionContext, ExecutionPipeline, TerminalOutcome, WorkState};
use workgraph::WorkGraphError;
use workgraph_test_utils::builders::{snapshot, ChangeSetBuilder};
use workgraph_test_utils::fakes::FakeWork;

fn run(work: &FakeWork) -> (TerminalOutcome, ExecutionContext) {
    let pipeline = ExecutionPipeline::standard();
    let state = WorkState::new();
    let mut ctx = ExecutionContext::new();
    let outcome = pipeline.execute(work, &state, &mut ctx).unwrap();
    assert_eq!(state.outcome(), Some(&outcome));
    (outcome, ctx)
}

#[test]
fn enabled_work_without_history_executes() {
    common::init_tracing();
    let work = FakeWork::new("compile");
    let (outcome, _) = run(&work);
    assert_eq!(outcome, TerminalOutcome::Executed);
    assert_eq!(work.executions(), 1);
}

#[test]
fn disabled_work_is_skipped_and_never_runs() {
    let work = FakeWork::new("compile").disabled();
    let (outcome, _) = run(&work);
    assert_eq!(outcome, TerminalOutcome::Skipped);
    assert_eq!(work.executions(), 0);
    assert!(work.was_marked_disabled());
}

#[test]
fn work_is_marked_disabled_before_the_predicate_runs() {
    let work = FakeWork::new("compile");
    let (_, _) = run(&work);
    // The provisional mark precedes predicate evaluation even for work
    // that turns out to be enabled.
    assert!(work.was_marked_disabled());
}

#[test]
fn failing_disabled_predicate_fails_the_work_without_running_it() {
    let work = FakeWork::new("compile").disabled_predicate_fails("boom");
    let (outcome, _) = run(&work);

    let failure = outcome.failure().expect("outcome should be a failure");
    match failure.as_ref() {
        WorkGraphError::DisabledPredicate { work: name, source } => {
            assert_eq!(name, "compile");
            assert_eq!(source.to_string(), "boom");
        }
        other => panic!("unexpected failure: {other}"),
    }
    assert_eq!(work.executions(), 0);
}

#[test]
fn unchanged_inputs_make_the_work_up_to_date() {
    let previous = ChangeSetBuilder::new()
        .property("sources", snapshot(&[("src/main.rs", "fn main() {}")]))
        .build();
    let current = ChangeSetBuilder::new()
        .property("sources", snapshot(&[("src/main.rs", "fn main() {}")]))
        .build();
    let work = FakeWork::new("compile")
        .with_previous(previous)
        .with_current(current);

    let (outcome, _) = run(&work);
    assert_eq!(outcome, TerminalOutcome::UpToDate);
    assert_eq!(work.executions(), 0);
}

#[test]
fn changed_inputs_execute_and_record_out_of_date_reasons() {
    let previous = ChangeSetBuilder::new()
        .property("sources", snapshot(&[("src/main.rs", "fn main() {}")]))
        .build();
    let current = ChangeSetBuilder::new()
        .property(
            "sources",
            snapshot(&[("src/main.rs", "fn main() { changed(); }")]),
        )
        .build();
    let work = FakeWork::new("compile")
        .with_previous(previous)
        .with_current(current);

    let (outcome, ctx) = run(&work);
    assert_eq!(outcome, TerminalOutcome::Executed);
    assert_eq!(work.executions(), 1);
    assert_eq!(
        ctx.out_of_date_messages,
        vec!["compile property 'sources' file src/main.rs has changed."]
    );
}

#[test]
fn no_previous_state_always_executes() {
    let current = ChangeSetBuilder::new()
        .property("sources", snapshot(&[("src/main.rs", "fn main() {}")]))
        .build();
    let work = FakeWork::new("compile").with_current(current);

    let (outcome, ctx) = run(&work);
    assert_eq!(outcome, TerminalOutcome::Executed);
    assert!(ctx.out_of_date_messages.is_empty());
}

#[test]
fn disabled_check_precedes_the_up_to_date_check() {
    // Same snapshots on both sides would be up to date, but disabled wins.
    let same = ChangeSetBuilder::new()
        .property("sources", snapshot(&[("a", "x")]))
        .build();
    let work = FakeWork::new("compile")
        .disabled()
        .with_previous(same.clone())
        .with_current(same);

    let (outcome, _) = run(&work);
    assert_eq!(outcome, TerminalOutcome::Skipped);
}

#[test]
fn execution_failure_becomes_a_failed_outcome() {
    let work = FakeWork::new("compile").failing("linker exploded");
    let (outcome, _) = run(&work);

    let failure = outcome.failure().expect("outcome should be a failure");
    assert_eq!(failure.to_string(), "linker exploded");
    assert_eq!(work.executions(), 1);
}

#[test]
fn a_terminal_outcome_is_never_overwritten() {
    let pipeline = ExecutionPipeline::standard();
    let work = FakeWork::new("compile");
    let state = WorkState::new();

    let first = pipeline
        .execute(&work, &state, &mut ExecutionContext::new())
        .unwrap();
    assert_eq!(first, TerminalOutcome::Executed);

    let second = pipeline.execute(&work, &state, &mut ExecutionContext::new());
    assert!(matches!(second, Err(WorkGraphError::Protocol(_))));
    // The recorded outcome is untouched.
    assert_eq!(state.outcome(), Some(&TerminalOutcome::Executed));
}

#[test]
fn failed_outcomes_compare_by_identity() {
    let work = FakeWork::new("compile").failing("boom");
    let (outcome, _) = run(&work);

    assert_eq!(outcome, outcome.clone());
    let other = run(&FakeWork::new("compile").failing("boom")).0;
    // Equal messages, distinct failures.
    assert_ne!(outcome, other);
}
