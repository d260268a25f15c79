//! Builds the per-element update records submitted to the analysis service

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::baseline::BaselineSnapshot;
use crate::changes::{ChangeEntry, ChangeStore};
use crate::elements::{ElementKey, ElementType, SubmissionCategory};

/// Fully resolved update for one element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementUpdate {
    pub key: ElementKey,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub beam_left: Option<ElementKey>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub beam_right: Option<ElementKey>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Update records grouped by submission category
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePayload {
    #[serde(default)]
    pub pier_updates: Vec<ElementUpdate>,
    /// Columns followed by struts
    #[serde(default)]
    pub column_updates: Vec<ElementUpdate>,
    #[serde(default)]
    pub beam_updates: Vec<ElementUpdate>,
    #[serde(default)]
    pub drop_beam_updates: Vec<ElementUpdate>,
}

impl UpdatePayload {
    pub fn updates(&self, category: SubmissionCategory) -> &[ElementUpdate] {
        match category {
            SubmissionCategory::Piers => &self.pier_updates,
            SubmissionCategory::Columns => &self.column_updates,
            SubmissionCategory::Beams => &self.beam_updates,
            SubmissionCategory::DropBeams => &self.drop_beam_updates,
        }
    }

    fn updates_mut(&mut self, category: SubmissionCategory) -> &mut Vec<ElementUpdate> {
        match category {
            SubmissionCategory::Piers => &mut self.pier_updates,
            SubmissionCategory::Columns => &mut self.column_updates,
            SubmissionCategory::Beams => &mut self.beam_updates,
            SubmissionCategory::DropBeams => &mut self.drop_beam_updates,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &ElementKey> {
        self.pier_updates
            .iter()
            .chain(&self.column_updates)
            .chain(&self.beam_updates)
            .chain(&self.drop_beam_updates)
            .map(|u| &u.key)
    }

    pub fn contains_key(&self, key: &ElementKey) -> bool {
        self.keys().any(|k| k == key)
    }

    pub fn len(&self) -> usize {
        self.pier_updates.len()
            + self.column_updates.len()
            + self.beam_updates.len()
            + self.drop_beam_updates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Resolve one field: change overlay, then baseline, then schema default.
/// `null` in the overlay or the baseline falls through.
pub fn resolve_field(overlay: Option<&Value>, baseline: Option<&Value>, default: i64) -> Value {
    overlay
        .filter(|v| !v.is_null())
        .or(baseline.filter(|v| !v.is_null()))
        .cloned()
        .unwrap_or_else(|| Value::from(default))
}

/// Turns pending keys into an [`UpdatePayload`] against a baseline snapshot
pub struct UpdatePayloadBuilder<'a> {
    changes: &'a ChangeStore,
    baseline: &'a BaselineSnapshot,
}

impl<'a> UpdatePayloadBuilder<'a> {
    pub fn new(changes: &'a ChangeStore, baseline: &'a BaselineSnapshot) -> Self {
        Self { changes, baseline }
    }

    /// Build the batch for `pending_keys`.
    ///
    /// Keys without a change entry or without a baseline record are left out
    /// of the batch.
    pub fn build(&self, pending_keys: &[ElementKey]) -> UpdatePayload {
        let mut payload = UpdatePayload::default();

        // ElementType ordering puts columns before struts
        for (element_type, keys) in self.changes.partition_by_type(pending_keys) {
            for key in keys {
                let Some(entry) = self.changes.get(&key) else {
                    continue;
                };
                if let Some(update) = self.resolve(element_type, &key, entry) {
                    payload.updates_mut(element_type.category()).push(update);
                }
            }
        }

        payload
    }

    fn resolve(
        &self,
        element_type: ElementType,
        key: &ElementKey,
        entry: &ChangeEntry,
    ) -> Option<ElementUpdate> {
        let Some(record) = self.baseline.find(element_type.category(), key) else {
            debug!("Dropping stale {} '{}': no baseline record", element_type, key);
            return None;
        };

        let layout = element_type.layout();
        let fields = element_type
            .schema()
            .fields()
            .iter()
            .map(|field| {
                let value = resolve_field(
                    entry.reinforcement_delta.get(field.name),
                    record.field(layout, field.name),
                    field.default,
                );
                (field.name.to_string(), value)
            })
            .collect();

        let (beam_left, beam_right) = match element_type {
            ElementType::Pier => (
                entry.beam_assignment.left.clone(),
                entry.beam_assignment.right.clone(),
            ),
            _ => (None, None),
        };

        Some(ElementUpdate {
            key: key.clone(),
            beam_left,
            beam_right,
            fields,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baseline::ElementRecord;
    use crate::changes::BeamSide;
    use serde_json::json;

    fn delta(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn baseline() -> BaselineSnapshot {
        BaselineSnapshot {
            piers: vec![ElementRecord::new("S2_P1")
                .with_field("diameterV", 10)
                .with_field("spacingV", Value::Null)
                .with_field("cover", 30)],
            columns: vec![
                ElementRecord::new("S1_C1").with_field("diameter", 20),
                ElementRecord::new("S1_ST1").with_type(ElementType::Strut),
            ],
            beams: vec![ElementRecord::new("S2_B1")
                .with_field("nBarsTop", 99)
                .with_field("reinforcement", json!({"nBarsTop": 4, "diameterTop": 20}))],
            drop_beams: vec![ElementRecord::new("S2_DB1").with_field("nLateralBars", 2)],
        }
    }

    #[test]
    fn test_precedence_branches() {
        assert_eq!(resolve_field(Some(&json!(12)), Some(&json!(10)), 8), json!(12));
        assert_eq!(resolve_field(None, Some(&json!(10)), 8), json!(10));
        assert_eq!(resolve_field(None, Some(&Value::Null), 8), json!(8));
        assert_eq!(resolve_field(None, None, 8), json!(8));
        assert_eq!(resolve_field(Some(&Value::Null), Some(&json!(10)), 8), json!(10));
    }

    #[test]
    fn test_pier_update_resolves_every_schema_field() {
        let mut changes = ChangeStore::new();
        let key = ElementKey::from("S2_P1");
        changes.record_reinforcement_change(key.clone(), ElementType::Pier, delta(json!({"diameterH": 12})));
        changes.record_beam_assignment(key.clone(), BeamSide::Right, "S2_B7".into()).unwrap();
        let baseline = baseline();

        let payload = UpdatePayloadBuilder::new(&changes, &baseline).build(&[key.clone()]);
        assert_eq!(payload.len(), 1);
        let update = &payload.pier_updates[0];
        assert_eq!(update.fields.len(), ElementType::Pier.schema().len());
        assert_eq!(update.fields["diameterH"], json!(12));
        assert_eq!(update.fields["diameterV"], json!(10));
        assert_eq!(update.fields["spacingV"], json!(200));
        assert_eq!(update.fields["cover"], json!(30));
        assert_eq!(update.beam_left, None);
        assert_eq!(update.beam_right, Some(ElementKey::from("S2_B7")));
    }

    #[test]
    fn test_beam_reads_nested_reinforcement() {
        let mut changes = ChangeStore::new();
        let key = ElementKey::from("S2_B1");
        changes.record_reinforcement_change(key.clone(), ElementType::Beam, delta(json!({"nBarsBottom": 5})));
        let baseline = baseline();

        let payload = UpdatePayloadBuilder::new(&changes, &baseline).build(&[key]);
        let update = &payload.beam_updates[0];
        assert_eq!(update.fields["nBarsTop"], json!(4));
        assert_eq!(update.fields["diameterTop"], json!(20));
        assert_eq!(update.fields["nBarsBottom"], json!(5));
        assert_eq!(update.fields["diameterBottom"], json!(16));
    }

    #[test]
    fn test_struts_follow_columns_in_column_updates() {
        let mut changes = ChangeStore::new();
        let strut = ElementKey::from("S1_ST1");
        let column = ElementKey::from("S1_C1");
        changes.record_reinforcement_change(strut.clone(), ElementType::Strut, delta(json!({"nBarsDepth": 2, "nBarsWidth": 2})));
        changes.record_reinforcement_change(column.clone(), ElementType::Column, Map::new());
        let baseline = baseline();

        let payload = UpdatePayloadBuilder::new(&changes, &baseline).build(&[strut.clone(), column.clone()]);
        let keys: Vec<_> = payload.column_updates.iter().map(|u| u.key.clone()).collect();
        assert_eq!(keys, vec![column, strut]);

        let strut_update = &payload.column_updates[1];
        assert_eq!(strut_update.fields["nBarsDepth"], json!(2));
        assert!(!strut_update.fields.contains_key("cover"));
        assert!(!strut_update.fields.contains_key("stirrupSpacing"));
        assert_eq!(payload.column_updates[0].fields["cover"], json!(40));
        assert_eq!(payload.column_updates[0].fields["diameter"], json!(20));
    }

    #[test]
    fn test_stale_key_dropped() {
        let mut changes = ChangeStore::new();
        changes.record_reinforcement_change("X".into(), ElementType::Pier, delta(json!({"diameterV": 10})));
        changes.record_reinforcement_change("S2_DB1".into(), ElementType::DropBeam, Map::new());
        let baseline = baseline();

        let payload = UpdatePayloadBuilder::new(&changes, &baseline)
            .build(&[ElementKey::from("X"), ElementKey::from("S2_DB1")]);
        assert!(!payload.contains_key(&ElementKey::from("X")));
        assert_eq!(payload.drop_beam_updates.len(), 1);
        assert_eq!(payload.drop_beam_updates[0].fields["nLateralBars"], json!(2));
    }

    #[test]
    fn test_update_wire_shape() {
        let mut fields = Map::new();
        fields.insert("cover".into(), json!(25));
        let update = ElementUpdate {
            key: "S2_P1".into(),
            beam_left: Some("S2_B1".into()),
            beam_right: None,
            fields,
        };
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            json!({"key": "S2_P1", "beamLeft": "S2_B1", "cover": 25})
        );
    }
}
