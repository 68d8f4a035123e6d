// src/changes/visitor.rs

//! Change visitor callbacks and the collecting implementation used by the
//! up-to-date check.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
}

/// One individual file change, tagged with a human-readable title combining
/// the enclosing unit-of-work title and the property name.
#[derive(Debug, Clone, Serialize)]
pub struct FileChange {
    pub title: String,
    pub path: PathBuf,
    pub kind: ChangeKind,
}

impl FileChange {
    pub(crate) fn new(title: &str, path: &Path, kind: ChangeKind) -> Self {
        Self {
            title: title.to_string(),
            path: path.to_path_buf(),
            kind,
        }
    }

    pub fn message(&self) -> String {
        match self.kind {
            ChangeKind::Added => format!("{} file {} has been added.", self.title, self.path.display()),
            ChangeKind::Removed => {
                format!("{} file {} has been removed.", self.title, self.path.display())
            }
            ChangeKind::Modified => format!("{} file {} has changed.", self.title, self.path.display()),
        }
    }
}

impl fmt::Display for FileChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// Visitor over individual file changes.
pub trait ChangeVisitor {
    /// Returns `false` to stop visiting further changes.
    fn visit(&mut self, change: &FileChange) -> bool;
}

/// Collects change messages up to a limit, then aborts the diff early.
///
/// One changed file is already enough evidence that work must re-run; the
/// limit only controls how many changes are reported to the user.
#[derive(Debug)]
pub struct CollectingChangeVisitor {
    messages: Vec<String>,
    limit: usize,
}

impl CollectingChangeVisitor {
    pub fn new(limit: usize) -> Self {
        Self {
            messages: Vec::new(),
            limit,
        }
    }

    pub fn has_changes(&self) -> bool {
        !self.messages.is_empty()
    }

    pub fn into_messages(self) -> Vec<String> {
        self.messages
    }
}

impl ChangeVisitor for CollectingChangeVisitor {
    fn visit(&mut self, change: &FileChange) -> bool {
        self.messages.push(change.message());
        self.messages.len() < self.limit
    }
}
