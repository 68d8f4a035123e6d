// src/ops/notification.rs

//! Build-operation events, notifications, and listener traits.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use serde_json::Value;

use crate::errors::Failure;

/// Opaque identity of one build operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct OperationId(pub u64);

/// Static description of one build operation.
///
/// Operations without a `details` payload are internal bookkeeping: they are
/// never published to notification listeners, but their children may still
/// resolve parent links through them.
#[derive(Debug, Clone)]
pub struct OperationDescriptor {
    pub id: OperationId,
    pub parent_id: Option<OperationId>,
    pub display_name: String,
    pub details: Option<Value>,
}

#[derive(Debug, Clone, Copy)]
pub struct OperationStart {
    /// Millis since the epoch.
    pub start_time: u64,
}

#[derive(Debug, Clone)]
pub struct OperationProgress {
    pub time: u64,
    pub details: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct OperationFinish {
    pub end_time: u64,
    pub result: Option<Value>,
    pub failure: Option<Failure>,
}

/// Low-level listener fed directly by the operation executor.
///
/// Events for different operations may arrive concurrently from multiple
/// worker threads; events for the same operation id are ordered (started
/// before any progress or finished).
pub trait BuildOperationListener: Send + Sync {
    fn started(&self, descriptor: &OperationDescriptor, event: &OperationStart);
    fn progress(&self, id: OperationId, event: &OperationProgress);
    fn finished(&self, descriptor: &OperationDescriptor, event: &OperationFinish);
}

#[derive(Debug, Clone)]
pub struct StartedNotification {
    pub timestamp: u64,
    pub id: OperationId,
    /// Nearest ancestor operation that carries details, if any.
    pub parent_id: Option<OperationId>,
    pub details: Value,
}

#[derive(Debug, Clone)]
pub struct ProgressNotification {
    /// The operation of interest this progress belongs to; progress raised
    /// by an uninteresting child is attributed to its nearest published
    /// ancestor.
    pub id: OperationId,
    pub timestamp: u64,
    pub details: Value,
}

#[derive(Debug, Clone)]
pub struct FinishedNotification {
    pub timestamp: u64,
    pub id: OperationId,
    pub parent_id: Option<OperationId>,
    pub details: Value,
    pub result: Option<Value>,
    pub failure: Option<Failure>,
}

/// One buffered or delivered notification.
#[derive(Debug, Clone)]
pub enum Notification {
    Started(StartedNotification),
    Progress(ProgressNotification),
    Finished(FinishedNotification),
}

/// The external observer of build operation notifications.
///
/// Returning an `Err` is an ordinary listener failure: it is logged at
/// debug level and swallowed so one broken listener cannot corrupt the
/// build. A panic is treated as a fatal process-level condition and is
/// propagated to the caller.
pub trait NotificationListener: Send + Sync {
    fn started(&self, notification: &StartedNotification) -> anyhow::Result<()>;
    fn progress(&self, notification: &ProgressNotification) -> anyhow::Result<()>;
    fn finished(&self, notification: &FinishedNotification) -> anyhow::Result<()>;
}

/// Simplified listener that only cares about started/finished; progress
/// notifications are discarded by the adapter.
pub trait BuildScopeListener: Send + Sync {
    fn started(&self, notification: &StartedNotification) -> anyhow::Result<()>;
    fn finished(&self, notification: &FinishedNotification) -> anyhow::Result<()>;
}

pub(crate) struct ScopeAdapter(pub(crate) Arc<dyn BuildScopeListener>);

impl NotificationListener for ScopeAdapter {
    fn started(&self, notification: &StartedNotification) -> anyhow::Result<()> {
        self.0.started(notification)
    }

    fn progress(&self, _notification: &ProgressNotification) -> anyhow::Result<()> {
        Ok(())
    }

    fn finished(&self, notification: &FinishedNotification) -> anyhow::Result<()> {
        self.0.finished(notification)
    }
}

pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
