// src/ops/bridge.rs

//! The build-operation notification bridge.
//!
//! Converts the low-level, possibly concurrent operation event stream into a
//! clean started/progress/finished stream for a single external listener:
//!
//! - parent/child relationships are reconstructed so that operations without
//!   a details payload are transparently looked through;
//! - notifications are buffered until a listener attaches, then replayed to
//!   it exactly once in arrival order before switching to live delivery.
//!
//! Lifecycle per build: `start()` opens the valve (an error if already
//! open), `stop()` closes it and discards all bookkeeping (a no-op when
//! already stopped). At most one listener may register per started build.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, WorkGraphError};
use crate::ops::notification::{
    BuildOperationListener, BuildScopeListener, FinishedNotification, Notification,
    NotificationListener, OperationDescriptor, OperationFinish, OperationId, OperationProgress,
    OperationStart, ProgressNotification, ScopeAdapter, StartedNotification,
};

/// Minimal concurrent map for operation bookkeeping.
///
/// Mutated concurrently by worker threads; the rwlock acquire/release pairs
/// provide the happens-before edge between a thread that inserts a link and
/// another that looks it up.
#[derive(Debug)]
struct ConcurrentMap<V> {
    inner: RwLock<HashMap<OperationId, V>>,
}

impl<V: Clone> ConcurrentMap<V> {
    fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    fn insert(&self, key: OperationId, value: V) {
        self.inner.write().insert(key, value);
    }

    fn remove(&self, key: OperationId) -> Option<V> {
        self.inner.write().remove(&key)
    }

    fn get(&self, key: OperationId) -> Option<V> {
        self.inner.read().get(&key).cloned()
    }

    fn contains(&self, key: OperationId) -> bool {
        self.inner.read().contains_key(&key)
    }
}

/// Buffers notifications until a listener attaches, then replays them and
/// switches to lock-free live delivery.
///
/// The one-way flip from "buffering" to "live" happens inside the buffer
/// lock's critical section, so a concurrent publisher observes either the
/// buffer or the live listener, never a mix: no notification is dropped,
/// duplicated, or delivered out of order relative to the replay.
struct ReplayGate {
    live: OnceLock<Arc<dyn NotificationListener>>,
    buffer: Mutex<Vec<Notification>>,
}

impl ReplayGate {
    fn new() -> Self {
        Self {
            live: OnceLock::new(),
            buffer: Mutex::new(Vec::new()),
        }
    }

    fn publish(&self, notification: Notification) {
        // Fast path once a listener is attached; `OnceLock::get` is only
        // `Some` after the replay under the buffer lock has completed.
        if let Some(listener) = self.live.get() {
            deliver(listener.as_ref(), &notification);
            return;
        }

        let mut buffer = self.buffer.lock();
        match self.live.get() {
            // Attach completed while this publisher waited for the lock.
            Some(listener) => deliver(listener.as_ref(), &notification),
            None => buffer.push(notification),
        }
    }

    fn attach(&self, listener: Arc<dyn NotificationListener>) -> Result<()> {
        let mut buffer = self.buffer.lock();
        if self.live.get().is_some() {
            return Err(WorkGraphError::protocol(
                "a notification listener is already registered",
            ));
        }

        for notification in buffer.drain(..) {
            deliver(listener.as_ref(), &notification);
        }

        // Still inside the critical section; the double-registration check
        // above guarantees this set succeeds.
        let _ = self.live.set(listener);
        Ok(())
    }
}

/// Ordinary listener failures are logged and swallowed; a panicking listener
/// propagates, since suppressing it could mask a fatal process condition.
fn deliver(listener: &dyn NotificationListener, notification: &Notification) {
    let result = match notification {
        Notification::Started(n) => listener.started(n),
        Notification::Progress(n) => listener.progress(n),
        Notification::Finished(n) => listener.finished(n),
    };
    if let Err(error) = result {
        debug!(%error, "notification listener failed; ignoring");
    }
}

/// Per-build bridge state, created by `start()` and dropped by `stop()`.
struct BridgeState {
    /// Operation id to the nearest published ancestor.
    parents: ConcurrentMap<OperationId>,
    /// Operations with a details payload that have started but not finished.
    active: ConcurrentMap<()>,
    gate: ReplayGate,
}

impl BridgeState {
    fn new() -> Self {
        Self {
            parents: ConcurrentMap::new(),
            active: ConcurrentMap::new(),
            gate: ReplayGate::new(),
        }
    }
}

/// Build-scoped notification bridge; see the module docs.
pub struct NotificationBridge {
    state: RwLock<Option<Arc<BridgeState>>>,
}

impl Default for NotificationBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationBridge {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(None),
        }
    }

    /// Open the valve for a new build: start tracking operations and
    /// buffering notifications.
    pub fn start(&self) -> Result<()> {
        let mut state = self.state.write();
        if state.is_some() {
            return Err(WorkGraphError::protocol(
                "notification bridge already started",
            ));
        }
        *state = Some(Arc::new(BridgeState::new()));
        Ok(())
    }

    /// Close the valve, discarding bookkeeping and any buffered
    /// notifications. A no-op when not started.
    pub fn stop(&self) {
        *self.state.write() = None;
    }

    /// Attach the single notification listener for this build.
    ///
    /// Buffered notifications are replayed to it in arrival order before
    /// live delivery begins.
    pub fn register(&self, listener: Arc<dyn NotificationListener>) -> Result<()> {
        self.require_state()?.gate.attach(listener)
    }

    /// Attach a started/finished-only listener; progress notifications are
    /// discarded.
    pub fn register_build_scope(&self, listener: Arc<dyn BuildScopeListener>) -> Result<()> {
        self.register(Arc::new(ScopeAdapter(listener)))
    }

    fn require_state(&self) -> Result<Arc<BridgeState>> {
        self.state
            .read()
            .clone()
            .ok_or_else(|| WorkGraphError::protocol("notification bridge has not been started"))
    }

    fn current(&self) -> Option<Arc<BridgeState>> {
        self.state.read().clone()
    }
}

impl BuildOperationListener for NotificationBridge {
    fn started(&self, descriptor: &OperationDescriptor, event: &OperationStart) {
        let Some(state) = self.current() else {
            return; // valve closed
        };

        // Establish the externally visible parent: the direct parent when it
        // is itself published, otherwise the link its bookkeeping recorded
        // (looking through operations without details).
        let mut parent_id = None;
        if let Some(direct) = descriptor.parent_id {
            if state.active.contains(direct) {
                parent_id = Some(direct);
            } else if let Some(link) = state.parents.get(direct) {
                parent_id = Some(link);
            }
            if let Some(link) = parent_id {
                state.parents.insert(descriptor.id, link);
            }
        }

        let Some(details) = &descriptor.details else {
            // Look-through operation: never published, never active, but its
            // children resolve their parent through the link recorded above.
            return;
        };

        state.active.insert(descriptor.id, ());
        state.gate.publish(Notification::Started(StartedNotification {
            timestamp: event.start_time,
            id: descriptor.id,
            parent_id,
            details: details.clone(),
        }));
    }

    fn progress(&self, id: OperationId, event: &OperationProgress) {
        let Some(state) = self.current() else {
            return;
        };
        let Some(details) = &event.details else {
            return;
        };

        // Attribute the progress to the nearest operation of interest.
        let owner = if state.active.contains(id) {
            Some(id)
        } else {
            state.parents.get(id)
        };
        let Some(owner) = owner else {
            debug!(id = id.0, "progress with no operation of interest in scope; dropping");
            return;
        };

        state.gate.publish(Notification::Progress(ProgressNotification {
            id: owner,
            timestamp: event.time,
            details: details.clone(),
        }));
    }

    fn finished(&self, descriptor: &OperationDescriptor, event: &OperationFinish) {
        let Some(state) = self.current() else {
            return;
        };

        let parent_id = state.parents.remove(descriptor.id);
        if state.active.remove(descriptor.id).is_none() {
            // Never published (no details, or already removed).
            return;
        }

        state.gate.publish(Notification::Finished(FinishedNotification {
            timestamp: event.end_time,
            id: descriptor.id,
            parent_id,
            details: descriptor.details.clone().unwrap_or(Value::Null),
            result: event.result.clone(),
            failure: event.failure.clone(),
        }));
    }
}
