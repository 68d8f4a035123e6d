// src/ops/executor.rs

//! Runs closures as build operations, emitting lifecycle events.
//!
//! The executor allocates operation identities and tracks the current
//! operation per worker thread so that nested operations (e.g. artifact
//! resolution inside a transform execution) are linked to their parent
//! without the caller threading ids through every call.

use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::errors::{Failure, Result};
use crate::ops::notification::{
    now_millis, BuildOperationListener, OperationDescriptor, OperationFinish, OperationProgress,
    OperationStart, OperationId,
};

thread_local! {
    /// Stack of operations currently executing on this thread.
    static CURRENT: RefCell<Vec<OperationId>> = const { RefCell::new(Vec::new()) };
}

pub struct BuildOperationExecutor {
    listener: Arc<dyn BuildOperationListener>,
    next_id: AtomicU64,
}

impl BuildOperationExecutor {
    pub fn new(listener: Arc<dyn BuildOperationListener>) -> Self {
        Self {
            listener,
            next_id: AtomicU64::new(1),
        }
    }

    fn allocate(&self, display_name: &str, details: Option<Value>) -> OperationDescriptor {
        let id = OperationId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let parent_id = CURRENT.with(|c| c.borrow().last().copied());
        OperationDescriptor {
            id,
            parent_id,
            display_name: display_name.to_string(),
            details,
        }
    }

    /// Start an operation explicitly; the caller decides when and how it
    /// finishes. Prefer [`run`](Self::run) unless the finish payload depends
    /// on the work's outcome.
    pub fn start(&self, display_name: &str, details: Option<Value>) -> OperationHandle<'_> {
        let descriptor = self.allocate(display_name, details);
        debug!(id = descriptor.id.0, name = %descriptor.display_name, "operation started");
        self.listener.started(
            &descriptor,
            &OperationStart {
                start_time: now_millis(),
            },
        );
        CURRENT.with(|c| c.borrow_mut().push(descriptor.id));
        OperationHandle {
            executor: self,
            descriptor,
            finished: false,
        }
    }

    /// Run `f` as one build operation.
    ///
    /// A failure returned by `f` is recorded on the finished event and also
    /// returned to the caller, shared rather than cloned.
    pub fn run<T>(
        &self,
        display_name: &str,
        details: Option<Value>,
        f: impl FnOnce() -> Result<T>,
    ) -> std::result::Result<T, Failure> {
        let op = self.start(display_name, details);
        match f() {
            Ok(value) => {
                op.finish(Some(Value::String("succeeded".into())), None);
                Ok(value)
            }
            Err(err) => {
                let failure: Failure = Arc::new(err);
                op.finish(None, Some(failure.clone()));
                Err(failure)
            }
        }
    }

    /// Run a batch of queued operations under one parent operation.
    ///
    /// `f` fills the queue (typically via `ArtifactSet::start_visit`); the
    /// queued operations then run in order, each as its own child
    /// operation, before this call returns. Failures of queued operations
    /// are recorded on their finished events; the submitter observes them
    /// through its own completion handle.
    pub fn run_all<T>(
        &self,
        display_name: &str,
        f: impl FnOnce(&mut OperationQueue<'_>) -> T,
    ) -> T {
        let op = self.start(display_name, None);
        let mut queue = OperationQueue {
            pending: Vec::new(),
        };
        let out = f(&mut queue);
        for (name, work) in queue.pending {
            let _ = self.run(&name, None, work);
        }
        op.finish(None, None);
        out
    }
}

/// An in-flight operation started via [`BuildOperationExecutor::start`].
pub struct OperationHandle<'a> {
    executor: &'a BuildOperationExecutor,
    descriptor: OperationDescriptor,
    finished: bool,
}

impl OperationHandle<'_> {
    pub fn descriptor(&self) -> &OperationDescriptor {
        &self.descriptor
    }

    /// Emit a progress event for this operation.
    pub fn progress(&self, details: Value) {
        self.executor.listener.progress(
            self.descriptor.id,
            &OperationProgress {
                time: now_millis(),
                details: Some(details),
            },
        );
    }

    /// Finish the operation with an explicit result payload and failure.
    pub fn finish(mut self, result: Option<Value>, failure: Option<Failure>) {
        self.finished = true;
        self.emit_finish(result, failure);
    }

    fn emit_finish(&self, result: Option<Value>, failure: Option<Failure>) {
        CURRENT.with(|c| {
            let mut stack = c.borrow_mut();
            if stack.last() == Some(&self.descriptor.id) {
                stack.pop();
            }
        });
        debug!(id = self.descriptor.id.0, failed = failure.is_some(), "operation finished");
        self.executor.listener.finished(
            &self.descriptor,
            &OperationFinish {
                end_time: now_millis(),
                result,
                failure,
            },
        );
    }
}

impl Drop for OperationHandle<'_> {
    fn drop(&mut self) {
        // Keeps the per-thread stack and the event stream balanced when the
        // operation body panicked past `finish`.
        if !self.finished {
            self.emit_finish(None, None);
        }
    }
}

/// Queue of operations submitted together via
/// [`BuildOperationExecutor::run_all`].
pub struct OperationQueue<'a> {
    #[allow(clippy::type_complexity)]
    pending: Vec<(String, Box<dyn FnOnce() -> Result<()> + Send + 'a>)>,
}

impl<'a> OperationQueue<'a> {
    pub fn add(
        &mut self,
        display_name: impl Into<String>,
        work: impl FnOnce() -> Result<()> + Send + 'a,
    ) {
        self.pending.push((display_name.into(), Box::new(work)));
    }
}
