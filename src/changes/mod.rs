// src/changes/mod.rs

//! Snapshot comparison and change detection.
//!
//! - [`snapshot`] holds the immutable file-collection snapshot types and the
//!   named per-property mapping recorded for one execution.
//! - [`diff`] computes the ordered, minimal difference between two property
//!   mappings and drives a visitor over the per-file changes.
//! - [`visitor`] defines the change visitor callbacks and a collecting
//!   implementation used by the up-to-date check.
//! - [`fingerprint`] builds snapshots from on-disk state; the detectors
//!   themselves never touch the filesystem.

pub mod diff;
pub mod fingerprint;
pub mod snapshot;
pub mod visitor;

pub use diff::{diff, visit_state_changes, PropertyDiffListener};
pub use snapshot::{
    ContentFingerprint, FileCollectionSnapshot, FileSnapshot, Fingerprint, PropertyChangeSet,
};
pub use visitor::{ChangeKind, ChangeVisitor, CollectingChangeVisitor, FileChange};
