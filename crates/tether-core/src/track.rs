use crate::value::Value;
use std::collections::{BTreeMap, BTreeSet};

///
/// DirtyTracker
///
/// Per-object record of which fields changed during the current epoch
/// (the span between two persists) and, when reset is enabled, their
/// values from before the first change.
///
/// Container fields are only mutated through the owning graph, so the
/// first structural change of a container arrives here like any other
/// assignment, carrying the container as it was before the change.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DirtyTracker {
    modified: BTreeSet<usize>,
    previous: BTreeMap<usize, Value>,
}

impl DirtyTracker {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            modified: BTreeSet::new(),
            previous: BTreeMap::new(),
        }
    }

    /// Record a change to `field`.
    /// Returns `true` when this is the field's first change in the epoch.
    pub fn observe(&mut self, field: usize, before: &Value, snapshot: bool) -> bool {
        if !self.modified.insert(field) {
            return false;
        }
        if snapshot {
            self.previous.insert(field, before.clone());
        }

        true
    }

    #[must_use]
    pub fn is_modified(&self, field: usize) -> bool {
        self.modified.contains(&field)
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        !self.modified.is_empty()
    }

    pub fn modified(&self) -> impl Iterator<Item = usize> + '_ {
        self.modified.iter().copied()
    }

    #[must_use]
    pub fn previous(&self, field: usize) -> Option<&Value> {
        self.previous.get(&field)
    }

    /// Drain the snapshots for a reset.
    pub fn take_previous(&mut self) -> BTreeMap<usize, Value> {
        std::mem::take(&mut self.previous)
    }

    /// Start a new epoch.
    pub fn close_epoch(&mut self) {
        self.modified.clear();
        self.previous.clear();
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_first_change_snapshots() {
        let mut tracker = DirtyTracker::new();

        assert!(tracker.observe(0, &Value::from("a"), true));
        assert!(!tracker.observe(0, &Value::from("b"), true));

        assert_eq!(tracker.previous(0), Some(&Value::from("a")));
    }

    #[test]
    fn snapshots_are_optional() {
        let mut tracker = DirtyTracker::new();
        tracker.observe(2, &Value::Int(1), false);

        assert!(tracker.is_modified(2));
        assert_eq!(tracker.previous(2), None);
    }

    #[test]
    fn close_epoch_clears_everything() {
        let mut tracker = DirtyTracker::new();
        tracker.observe(1, &Value::Null, true);
        tracker.close_epoch();

        assert!(!tracker.is_dirty());
        assert!(tracker.take_previous().is_empty());
    }
}
