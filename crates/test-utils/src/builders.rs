#![allow(dead_code)]

//! Builders for snapshots and change sets used across the test suite.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use workgraph::changes::{
    ContentFingerprint, FileCollectionSnapshot, FileSnapshot, Fingerprint, PropertyChangeSet,
};

/// Builder for an in-memory [`FileCollectionSnapshot`].
///
/// File content is given as a string; the fingerprint is derived from it, so
/// two builders with the same files and contents produce equal hashes.
pub struct SnapshotBuilder {
    entries: BTreeMap<PathBuf, FileSnapshot>,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    pub fn file(mut self, path: &str, content: &str) -> Self {
        let path = PathBuf::from(path);
        let normalized = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        self.entries.insert(
            path,
            FileSnapshot {
                normalized,
                content: ContentFingerprint::Regular(Fingerprint::of_bytes(content.as_bytes())),
            },
        );
        self
    }

    pub fn directory(mut self, path: &str) -> Self {
        let path = PathBuf::from(path);
        let normalized = path.to_string_lossy().into_owned();
        self.entries.insert(
            path,
            FileSnapshot {
                normalized,
                content: ContentFingerprint::Directory,
            },
        );
        self
    }

    pub fn missing(mut self, path: &str) -> Self {
        let path = PathBuf::from(path);
        let normalized = path.to_string_lossy().into_owned();
        self.entries.insert(
            path,
            FileSnapshot {
                normalized,
                content: ContentFingerprint::Missing,
            },
        );
        self
    }

    pub fn build(self) -> Arc<FileCollectionSnapshot> {
        Arc::new(FileCollectionSnapshot::new(self.entries))
    }
}

impl Default for SnapshotBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Shorthand: a snapshot of `(path, content)` pairs.
pub fn snapshot(files: &[(&str, &str)]) -> Arc<FileCollectionSnapshot> {
    let mut builder = SnapshotBuilder::new();
    for (path, content) in files {
        builder = builder.file(path, content);
    }
    builder.build()
}

/// Builder for a [`PropertyChangeSet`].
pub struct ChangeSetBuilder {
    change_set: PropertyChangeSet,
}

impl ChangeSetBuilder {
    pub fn new() -> Self {
        Self {
            change_set: PropertyChangeSet::new(),
        }
    }

    pub fn property(mut self, name: &str, snapshot: Arc<FileCollectionSnapshot>) -> Self {
        self.change_set.insert(name, snapshot);
        self
    }

    pub fn build(self) -> PropertyChangeSet {
        self.change_set
    }
}

impl Default for ChangeSetBuilder {
    fn default() -> Self {
        Self::new()
    }
}
