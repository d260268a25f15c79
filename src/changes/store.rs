//! Sparse per-element change overlays

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

use crate::elements::{ElementKey, ElementType};
use crate::error::{RecalcError, RecalcResult};

/// Side of a pier a coupling beam frames into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BeamSide {
    Left,
    Right,
}

/// Replacement coupling beams for a pier; `None` leaves that side unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeamAssignment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub left: Option<ElementKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub right: Option<ElementKey>,
}

impl BeamAssignment {
    pub fn get(&self, side: BeamSide) -> Option<&ElementKey> {
        match side {
            BeamSide::Left => self.left.as_ref(),
            BeamSide::Right => self.right.as_ref(),
        }
    }

    fn set(&mut self, side: BeamSide, beam: ElementKey) {
        match side {
            BeamSide::Left => self.left = Some(beam),
            BeamSide::Right => self.right = Some(beam),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }
}

/// Pending change for one element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEntry {
    /// Fixed when the entry is created
    pub element_type: ElementType,
    /// Only the fields the user changed, last write per field wins
    pub reinforcement_delta: Map<String, Value>,
    /// Meaningful for piers only
    #[serde(default)]
    pub beam_assignment: BeamAssignment,
}

impl ChangeEntry {
    pub fn new(element_type: ElementType) -> Self {
        Self {
            element_type,
            reinforcement_delta: Map::new(),
            beam_assignment: BeamAssignment::default(),
        }
    }
}

/// At most one [`ChangeEntry`] per element key
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeStore {
    entries: HashMap<ElementKey, ChangeEntry>,
}

impl ChangeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overlay `delta` onto the entry for `key`, creating it with
    /// `element_type` if absent. The type of an existing entry is kept.
    pub fn record_reinforcement_change(
        &mut self,
        key: ElementKey,
        element_type: ElementType,
        delta: Map<String, Value>,
    ) {
        let entry = self
            .entries
            .entry(key)
            .or_insert_with(|| ChangeEntry::new(element_type));
        for (field, value) in delta {
            entry.reinforcement_delta.insert(field, value);
        }
    }

    /// Set the coupling beam on one side of a pier
    pub fn record_beam_assignment(
        &mut self,
        pier_key: ElementKey,
        side: BeamSide,
        beam_key: ElementKey,
    ) -> RecalcResult<()> {
        if let Some(existing) = self.entries.get(&pier_key) {
            if existing.element_type != ElementType::Pier {
                return Err(RecalcError::InvalidElementType {
                    key: pier_key,
                    actual: existing.element_type,
                });
            }
        }
        self.entries
            .entry(pier_key)
            .or_insert_with(|| ChangeEntry::new(ElementType::Pier))
            .beam_assignment
            .set(side, beam_key);
        Ok(())
    }

    pub fn get(&self, key: &ElementKey) -> Option<&ChangeEntry> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &ElementKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remove(&mut self, key: &ElementKey) -> Option<ChangeEntry> {
        self.entries.remove(key)
    }

    pub fn remove_all<'a>(&mut self, keys: impl IntoIterator<Item = &'a ElementKey>) {
        for key in keys {
            self.entries.remove(key);
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Group `keys` by the type of their entry, preserving input order within
    /// each group. Keys without an entry are skipped.
    pub fn partition_by_type<'a>(
        &self,
        keys: impl IntoIterator<Item = &'a ElementKey>,
    ) -> BTreeMap<ElementType, Vec<ElementKey>> {
        let mut partitions: BTreeMap<ElementType, Vec<ElementKey>> = BTreeMap::new();
        for key in keys {
            if let Some(entry) = self.entries.get(key) {
                partitions
                    .entry(entry.element_type)
                    .or_default()
                    .push(key.clone());
            }
        }
        partitions
    }
}
