use std::collections::BTreeMap;

use proptest::prelude::*;
use workgraph::changes::{diff, FileCollectionSnapshot, PropertyDiffListener};
use workgraph_test_utils::builders::{snapshot, ChangeSetBuilder};

#[derive(Debug, PartialEq, Eq, Clone)]
enum Event {
    Removed(String),
    Added(String),
    Updated(String),
}

#[derive(Default)]
struct Collector(Vec<Event>);

impl PropertyDiffListener for Collector {
    fn removed(&mut self, property: &str) -> bool {
        self.0.push(Event::Removed(property.to_string()));
        true
    }

    fn added(&mut self, property: &str) -> bool {
        self.0.push(Event::Added(property.to_string()));
        true
    }

    fn updated(
        &mut self,
        property: &str,
        _previous: &FileCollectionSnapshot,
        _current: &FileCollectionSnapshot,
    ) -> bool {
        self.0.push(Event::Updated(property.to_string()));
        true
    }
}

fn property_map() -> impl Strategy<Value = BTreeMap<String, u8>> {
    // Small name alphabet so the two sides overlap often.
    proptest::collection::btree_map("[a-e]{1,2}", any::<u8>(), 0..6)
}

fn change_set(map: &BTreeMap<String, u8>) -> workgraph::changes::PropertyChangeSet {
    let mut builder = ChangeSetBuilder::new();
    for (name, content) in map {
        builder = builder.property(name, snapshot(&[("file", &content.to_string())]));
    }
    builder.build()
}

proptest! {
    /// The diff reports exactly the symmetric difference plus the
    /// content-changed intersection, each property once, in ascending name
    /// order.
    #[test]
    fn diff_visits_exactly_the_differing_properties(
        previous in property_map(),
        current in property_map(),
    ) {
        let mut expected = Vec::new();
        for name in previous.keys() {
            if !current.contains_key(name) {
                expected.push(Event::Removed(name.clone()));
            }
        }
        for name in current.keys() {
            if !previous.contains_key(name) {
                expected.push(Event::Added(name.clone()));
            }
        }
        for (name, content) in &previous {
            if current.get(name).is_some_and(|c| c != content) {
                expected.push(Event::Updated(name.clone()));
            }
        }
        expected.sort_by(|a, b| {
            let name = |e: &Event| match e {
                Event::Removed(n) | Event::Added(n) | Event::Updated(n) => n.clone(),
            };
            name(a).cmp(&name(b))
        });

        let mut collector = Collector::default();
        let completed = diff(&change_set(&previous), &change_set(&current), &mut collector);

        prop_assert!(completed);
        prop_assert_eq!(collector.0, expected);
    }

    /// Diffing a change set against itself reports nothing.
    #[test]
    fn diff_against_self_is_empty(map in property_map()) {
        let set = change_set(&map);
        let mut collector = Collector::default();
        prop_assert!(diff(&set, &set, &mut collector));
        prop_assert!(collector.0.is_empty());
    }
}
