// src/changes/diff.rs

//! Ordered diff of two named snapshot mappings.

use tracing::debug;

use crate::changes::snapshot::{FileCollectionSnapshot, PropertyChangeSet};
use crate::changes::visitor::ChangeVisitor;

/// Listener for property-level differences between two change sets.
///
/// Each callback returns a "continue?" signal; the diff stops early once any
/// callback returns `false`.
pub trait PropertyDiffListener {
    /// The property exists only in the previous change set.
    fn removed(&mut self, property: &str) -> bool;

    /// The property exists only in the current change set.
    fn added(&mut self, property: &str) -> bool;

    /// The property exists in both change sets with differing snapshots.
    fn updated(
        &mut self,
        property: &str,
        previous: &FileCollectionSnapshot,
        current: &FileCollectionSnapshot,
    ) -> bool;
}

/// Walk the properties present in either change set in ascending name order,
/// reporting each difference exactly once.
///
/// Properties present in both mappings are reported as `updated` only when
/// their combined hashes differ. Returns `false` if a callback stopped the
/// walk early, `true` otherwise.
pub fn diff(
    previous: &PropertyChangeSet,
    current: &PropertyChangeSet,
    listener: &mut dyn PropertyDiffListener,
) -> bool {
    let mut previous = previous.iter().peekable();
    let mut current = current.iter().peekable();

    loop {
        let keep_going = match (previous.peek(), current.peek()) {
            (None, None) => return true,
            (Some((name, _)), None) => {
                let keep_going = listener.removed(name);
                previous.next();
                keep_going
            }
            (None, Some((name, _))) => {
                let keep_going = listener.added(name);
                current.next();
                keep_going
            }
            (Some((prev_name, prev_snap)), Some((cur_name, cur_snap))) => {
                match prev_name.cmp(cur_name) {
                    std::cmp::Ordering::Less => {
                        let keep_going = listener.removed(prev_name);
                        previous.next();
                        keep_going
                    }
                    std::cmp::Ordering::Greater => {
                        let keep_going = listener.added(cur_name);
                        current.next();
                        keep_going
                    }
                    std::cmp::Ordering::Equal => {
                        let keep_going = if prev_snap.hash() != cur_snap.hash() {
                            listener.updated(cur_name, prev_snap, cur_snap)
                        } else {
                            true
                        };
                        previous.next();
                        current.next();
                        keep_going
                    }
                }
            }
        };

        if !keep_going {
            return false;
        }
    }
}

/// Diff two change sets and forward every individual file change of every
/// updated property to `visitor`.
///
/// File changes are tagged with `"{title} property '{name}'"`. Properties
/// that were added or removed wholesale carry no per-file detail and do not
/// stop the walk on their own.
pub fn visit_state_changes(
    title: &str,
    previous: &PropertyChangeSet,
    current: &PropertyChangeSet,
    include_added: bool,
    visitor: &mut dyn ChangeVisitor,
) -> bool {
    struct StateDiffListener<'a> {
        title: &'a str,
        include_added: bool,
        visitor: &'a mut dyn ChangeVisitor,
    }

    impl PropertyDiffListener for StateDiffListener<'_> {
        fn removed(&mut self, property: &str) -> bool {
            debug!(property, "property no longer tracked");
            true
        }

        fn added(&mut self, property: &str) -> bool {
            debug!(property, "property newly tracked");
            true
        }

        fn updated(
            &mut self,
            property: &str,
            previous: &FileCollectionSnapshot,
            current: &FileCollectionSnapshot,
        ) -> bool {
            let property_title = format!("{} property '{}'", self.title, property);
            current.visit_changes_since(previous, &property_title, self.include_added, self.visitor)
        }
    }

    diff(
        previous,
        current,
        &mut StateDiffListener {
            title,
            include_added,
            visitor,
        },
    )
}
