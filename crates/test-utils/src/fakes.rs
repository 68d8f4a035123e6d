#![allow(dead_code)]

//! Fake collaborators for tests: artifact sets, notification listeners and
//! units of work that record how they were driven.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::anyhow;
use parking_lot::Mutex;

use workgraph::changes::PropertyChangeSet;
use workgraph::errors::Failure;
use workgraph::graph::{ArtifactSet, ArtifactVisitor, ResolveCompletion, ResolvedArtifact};
use workgraph::ops::{
    FinishedNotification, Notification, NotificationListener, OperationQueue, ProgressNotification,
    StartedNotification,
};
use workgraph::pipeline::UnitOfWork;

/// An artifact set that resolves to fixed artifacts or failures through the
/// regular operation-queue machinery.
pub struct FixedArtifactSet {
    name: String,
    artifacts: Vec<ResolvedArtifact>,
    failures: Vec<Failure>,
}

impl FixedArtifactSet {
    pub fn resolving_to(name: &str, file: &str) -> Self {
        Self {
            name: name.to_string(),
            artifacts: vec![ResolvedArtifact {
                id: name.to_string(),
                file: file.into(),
            }],
            failures: Vec::new(),
        }
    }

    pub fn failing_with(name: &str, failures: Vec<Failure>) -> Self {
        Self {
            name: name.to_string(),
            artifacts: Vec::new(),
            failures,
        }
    }
}

type ResolveOutcome = (Vec<ResolvedArtifact>, Vec<Failure>);

struct FixedCompletion {
    slot: Arc<Mutex<Option<ResolveOutcome>>>,
}

impl ResolveCompletion for FixedCompletion {
    fn visit(&mut self, visitor: &mut dyn ArtifactVisitor) {
        if let Some((artifacts, failures)) = self.slot.lock().take() {
            for artifact in &artifacts {
                visitor.artifact(artifact);
            }
            for failure in &failures {
                visitor.failure(failure);
            }
        }
    }
}

impl ArtifactSet for FixedArtifactSet {
    fn display_name(&self) -> &str {
        &self.name
    }

    fn start_visit(&self, queue: &mut OperationQueue<'_>) -> Box<dyn ResolveCompletion> {
        let slot = Arc::new(Mutex::new(None));
        let fill = Arc::clone(&slot);
        let artifacts = self.artifacts.clone();
        let failures = self.failures.clone();
        queue.add(format!("resolve {}", self.name), move || {
            *fill.lock() = Some((artifacts, failures));
            Ok(())
        });
        Box::new(FixedCompletion { slot })
    }
}

/// Records every notification it receives, in arrival order.
#[derive(Default)]
pub struct RecordingListener {
    events: Mutex<Vec<Notification>>,
}

impl RecordingListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<Notification> {
        self.events.lock().clone()
    }
}

impl NotificationListener for RecordingListener {
    fn started(&self, notification: &StartedNotification) -> anyhow::Result<()> {
        self.events
            .lock()
            .push(Notification::Started(notification.clone()));
        Ok(())
    }

    fn progress(&self, notification: &ProgressNotification) -> anyhow::Result<()> {
        self.events
            .lock()
            .push(Notification::Progress(notification.clone()));
        Ok(())
    }

    fn finished(&self, notification: &FinishedNotification) -> anyhow::Result<()> {
        self.events
            .lock()
            .push(Notification::Finished(notification.clone()));
        Ok(())
    }
}

enum DisabledBehaviour {
    Enabled,
    Disabled,
    EvaluationFails(String),
}

/// A unit of work that records how the pipeline drove it.
pub struct FakeWork {
    name: String,
    disabled: DisabledBehaviour,
    failure_message: Option<String>,
    executions: AtomicUsize,
    marked_disabled: AtomicBool,
    previous: Option<PropertyChangeSet>,
    current: PropertyChangeSet,
}

impl FakeWork {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            disabled: DisabledBehaviour::Enabled,
            failure_message: None,
            executions: AtomicUsize::new(0),
            marked_disabled: AtomicBool::new(false),
            previous: None,
            current: PropertyChangeSet::new(),
        }
    }

    /// The disabled predicate evaluates to `true`.
    pub fn disabled(mut self) -> Self {
        self.disabled = DisabledBehaviour::Disabled;
        self
    }

    /// The disabled predicate fails to evaluate.
    pub fn disabled_predicate_fails(mut self, message: &str) -> Self {
        self.disabled = DisabledBehaviour::EvaluationFails(message.to_string());
        self
    }

    /// Execution fails with the given message.
    pub fn failing(mut self, message: &str) -> Self {
        self.failure_message = Some(message.to_string());
        self
    }

    pub fn with_previous(mut self, previous: PropertyChangeSet) -> Self {
        self.previous = Some(previous);
        self
    }

    pub fn with_current(mut self, current: PropertyChangeSet) -> Self {
        self.current = current;
        self
    }

    pub fn executions(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }

    pub fn was_marked_disabled(&self) -> bool {
        self.marked_disabled.load(Ordering::SeqCst)
    }
}

impl UnitOfWork for FakeWork {
    fn display_name(&self) -> &str {
        &self.name
    }

    fn mark_disabled(&self) {
        self.marked_disabled.store(true, Ordering::SeqCst);
    }

    fn is_disabled(&self) -> anyhow::Result<bool> {
        match &self.disabled {
            DisabledBehaviour::Enabled => Ok(false),
            DisabledBehaviour::Disabled => Ok(true),
            DisabledBehaviour::EvaluationFails(message) => Err(anyhow!("{message}")),
        }
    }

    fn execute(&self) -> anyhow::Result<()> {
        self.executions.fetch_add(1, Ordering::SeqCst);
        match &self.failure_message {
            Some(message) => Err(anyhow!("{message}")),
            None => Ok(()),
        }
    }

    fn previous_state(&self) -> Option<&PropertyChangeSet> {
        self.previous.as_ref()
    }

    fn current_state(&self) -> &PropertyChangeSet {
        &self.current
    }
}
