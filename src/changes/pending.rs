//! Keys awaiting submission and the in-flight flag

use std::collections::HashSet;

use crate::elements::ElementKey;

/// Insertion-ordered set of pending element keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingSet {
    order: Vec<ElementKey>,
    members: HashSet<ElementKey>,
    in_flight: bool,
}

impl PendingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// No-op if `key` is already pending
    pub fn add(&mut self, key: ElementKey) {
        if self.members.insert(key.clone()) {
            self.order.push(key);
        }
    }

    pub fn remove(&mut self, key: &ElementKey) {
        if self.members.remove(key) {
            self.order.retain(|k| k != key);
        }
    }

    pub fn remove_all<'a>(&mut self, keys: impl IntoIterator<Item = &'a ElementKey>) {
        let mut removed = false;
        for key in keys {
            removed |= self.members.remove(key);
        }
        if removed {
            let members = &self.members;
            self.order.retain(|k| members.contains(k));
        }
    }

    pub fn contains(&self, key: &ElementKey) -> bool {
        self.members.contains(key)
    }

    /// Point-in-time copy of the pending keys
    pub fn snapshot_keys(&self) -> Vec<ElementKey> {
        self.order.clone()
    }

    pub fn set_in_flight(&mut self, in_flight: bool) {
        self.in_flight = in_flight;
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Drops every pending key; the in-flight flag is left alone
    pub fn clear(&mut self) {
        self.order.clear();
        self.members.clear();
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
