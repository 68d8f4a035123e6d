// src/ops/mod.rs

//! Build operations and the notification bridge.
//!
//! Every node execution (and nested sub-operation such as artifact
//! resolution) is raised as a build operation with a start/progress/finish
//! lifecycle:
//!
//! - [`executor`] allocates operation identities, tracks the per-thread
//!   current operation for parent linkage, and emits the low-level events.
//! - [`bridge`] converts the low-level, possibly concurrent event stream
//!   into a clean notification stream for a single external listener,
//!   buffering events until the listener attaches and replaying them
//!   exactly once.
//! - [`notification`] defines the event and notification types plus the
//!   listener traits on both sides of the bridge.

pub mod bridge;
pub mod executor;
pub mod notification;

pub use bridge::NotificationBridge;
pub use executor::{BuildOperationExecutor, OperationHandle, OperationQueue};
pub use notification::{
    BuildOperationListener, BuildScopeListener, FinishedNotification, Notification,
    NotificationListener, OperationDescriptor, OperationFinish, OperationId, OperationProgress,
    OperationStart, ProgressNotification, StartedNotification,
};
