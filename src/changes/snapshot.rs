// src/changes/snapshot.rs

//! Immutable file-collection snapshots.
//!
//! A [`FileCollectionSnapshot`] records the identity and content of a named
//! set of files at one point in time. Snapshots are produced by an external
//! collaborator (or by [`crate::changes::fingerprint`]) and are only ever
//! *compared* here; this module never reads the filesystem.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::changes::visitor::{ChangeKind, ChangeVisitor, FileChange};

/// A blake3 content hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub fn of_bytes(bytes: &[u8]) -> Self {
        Self(*blake3::hash(bytes).as_bytes())
    }

    pub(crate) fn from_hash(hash: blake3::Hash) -> Self {
        Self(*hash.as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        blake3::Hash::from_bytes(self.0).to_hex().to_string()
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", &self.to_hex()[..12])
    }
}

/// Content fingerprint of a single file-system entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentFingerprint {
    Regular(Fingerprint),
    Directory,
    /// The path was covered by the collection but did not exist.
    Missing,
}

/// Per-path entry of a [`FileCollectionSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSnapshot {
    /// Normalized identity of the file within the collection (the part that
    /// is compared across machines, typically the file name).
    pub normalized: String,
    pub content: ContentFingerprint,
}

/// An immutable snapshot of the identity and content of a collection of
/// files at one point in time.
///
/// Shared by reference between the previous-execution record and diff
/// computations; never mutated after construction. Two snapshots are
/// considered unchanged when their combined hashes are equal.
#[derive(Debug, Clone)]
pub struct FileCollectionSnapshot {
    hash: Fingerprint,
    entries: BTreeMap<PathBuf, FileSnapshot>,
}

impl FileCollectionSnapshot {
    /// Build a snapshot from per-path entries, deriving the combined hash
    /// from the entries in path order.
    pub fn new(entries: BTreeMap<PathBuf, FileSnapshot>) -> Self {
        let mut hasher = blake3::Hasher::new();
        for (path, snapshot) in &entries {
            hasher.update(path.to_string_lossy().as_bytes());
            hasher.update(snapshot.normalized.as_bytes());
            match &snapshot.content {
                ContentFingerprint::Regular(fp) => {
                    hasher.update(b"f");
                    hasher.update(fp.as_bytes());
                }
                ContentFingerprint::Directory => {
                    hasher.update(b"d");
                }
                ContentFingerprint::Missing => {
                    hasher.update(b"m");
                }
            }
        }
        Self {
            hash: Fingerprint::from_hash(hasher.finalize()),
            entries,
        }
    }

    pub fn empty() -> Self {
        Self::new(BTreeMap::new())
    }

    /// Combined hash of the contents of this snapshot.
    pub fn hash(&self) -> Fingerprint {
        self.hash
    }

    /// All covered paths, including ones recorded as missing.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.entries.keys().map(|p| p.as_path())
    }

    /// Per-path normalized snapshots, in path order.
    pub fn snapshots(&self) -> &BTreeMap<PathBuf, FileSnapshot> {
        &self.entries
    }

    /// Content fingerprint for one covered path.
    pub fn content_fingerprint(&self, path: &Path) -> Option<&ContentFingerprint> {
        self.entries.get(path).map(|s| &s.content)
    }

    /// Visit the per-file changes since `old`, in path order.
    ///
    /// Every reported change carries `title` so a caller can tell which
    /// property of which unit of work it belongs to. When `include_added` is
    /// false, files present only in `self` are not reported.
    ///
    /// Each visitor call returns a "continue?" signal; visiting stops and
    /// returns `false` as soon as a callback returns `false`.
    pub fn visit_changes_since(
        &self,
        old: &FileCollectionSnapshot,
        title: &str,
        include_added: bool,
        visitor: &mut dyn ChangeVisitor,
    ) -> bool {
        let mut previous = old.entries.iter().peekable();
        let mut current = self.entries.iter().peekable();

        loop {
            let change = match (previous.peek(), current.peek()) {
                (None, None) => return true,
                (Some((path, _)), None) => {
                    let change = FileChange::new(title, path, ChangeKind::Removed);
                    previous.next();
                    Some(change)
                }
                (None, Some((path, _))) => {
                    let change = include_added
                        .then(|| FileChange::new(title, path, ChangeKind::Added));
                    current.next();
                    change
                }
                (Some((prev_path, prev_snap)), Some((cur_path, cur_snap))) => {
                    match prev_path.cmp(cur_path) {
                        std::cmp::Ordering::Less => {
                            let change = FileChange::new(title, prev_path, ChangeKind::Removed);
                            previous.next();
                            Some(change)
                        }
                        std::cmp::Ordering::Greater => {
                            let change = include_added
                                .then(|| FileChange::new(title, cur_path, ChangeKind::Added));
                            current.next();
                            change
                        }
                        std::cmp::Ordering::Equal => {
                            let change = (prev_snap != cur_snap)
                                .then(|| FileChange::new(title, cur_path, ChangeKind::Modified));
                            previous.next();
                            current.next();
                            change
                        }
                    }
                }
            };

            if let Some(change) = change {
                if !visitor.visit(&change) {
                    return false;
                }
            }
        }
    }
}

/// The named mapping of per-property snapshots captured for one execution of
/// a unit of work.
///
/// Ordered by property name so that diffing two change sets visits
/// properties in a deterministic, lexicographic order.
#[derive(Debug, Clone, Default)]
pub struct PropertyChangeSet {
    properties: BTreeMap<String, Arc<FileCollectionSnapshot>>,
}

impl PropertyChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, property: impl Into<String>, snapshot: Arc<FileCollectionSnapshot>) {
        self.properties.insert(property.into(), snapshot);
    }

    pub fn with(mut self, property: impl Into<String>, snapshot: Arc<FileCollectionSnapshot>) -> Self {
        self.insert(property, snapshot);
        self
    }

    pub fn get(&self, property: &str) -> Option<&Arc<FileCollectionSnapshot>> {
        self.properties.get(property)
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Properties in ascending name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<FileCollectionSnapshot>)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v))
    }
}
