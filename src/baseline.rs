//! Last server-confirmed element state

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::elements::{ElementKey, ElementType, SourceLayout, SubmissionCategory};

/// One element as last confirmed by the analysis service.
///
/// Only `key` and `elementType` are interpreted directly. Every other field is
/// kept as raw JSON and read through a [`SourceLayout`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementRecord {
    pub key: ElementKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_type: Option<ElementType>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ElementRecord {
    pub fn new(key: impl Into<ElementKey>) -> Self {
        Self {
            key: key.into(),
            element_type: None,
            fields: Map::new(),
        }
    }

    pub fn with_type(mut self, element_type: ElementType) -> Self {
        self.element_type = Some(element_type);
        self
    }

    pub fn with_field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    /// Object holding the element's reinforcement fields for `layout`
    pub fn source(&self, layout: SourceLayout) -> Option<&Map<String, Value>> {
        match layout {
            SourceLayout::Flat => Some(&self.fields),
            SourceLayout::Nested(name) => self.fields.get(name).and_then(Value::as_object),
        }
    }

    /// Overlay `values` onto the element's source object. A missing or
    /// non-object nested source is replaced with a fresh object.
    pub fn overlay_source(&mut self, layout: SourceLayout, values: &Map<String, Value>) {
        match layout {
            SourceLayout::Flat => {
                for (field, value) in values {
                    self.fields.insert(field.clone(), value.clone());
                }
            }
            SourceLayout::Nested(name) => {
                let mut nested = match self.fields.remove(name) {
                    Some(Value::Object(map)) => map,
                    _ => Map::new(),
                };
                for (field, value) in values {
                    nested.insert(field.clone(), value.clone());
                }
                self.fields.insert(name.to_string(), Value::Object(nested));
            }
        }
    }

    /// Existing value of `name`; `null` counts as absent
    pub fn field(&self, layout: SourceLayout, name: &str) -> Option<&Value> {
        self.source(layout)
            .and_then(|src| src.get(name))
            .filter(|v| !v.is_null())
    }
}

/// Baseline element data, partitioned by submission category.
///
/// Owned by the edit session: read by the payload builder, written only by
/// the reconciler after a confirmed successful batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaselineSnapshot {
    #[serde(default)]
    pub piers: Vec<ElementRecord>,
    /// Columns and struts
    #[serde(default)]
    pub columns: Vec<ElementRecord>,
    #[serde(default)]
    pub beams: Vec<ElementRecord>,
    #[serde(default)]
    pub drop_beams: Vec<ElementRecord>,
}

impl BaselineSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn partition(&self, category: SubmissionCategory) -> &[ElementRecord] {
        match category {
            SubmissionCategory::Piers => &self.piers,
            SubmissionCategory::Columns => &self.columns,
            SubmissionCategory::Beams => &self.beams,
            SubmissionCategory::DropBeams => &self.drop_beams,
        }
    }

    pub fn partition_mut(&mut self, category: SubmissionCategory) -> &mut Vec<ElementRecord> {
        match category {
            SubmissionCategory::Piers => &mut self.piers,
            SubmissionCategory::Columns => &mut self.columns,
            SubmissionCategory::Beams => &mut self.beams,
            SubmissionCategory::DropBeams => &mut self.drop_beams,
        }
    }

    pub fn find(&self, category: SubmissionCategory, key: &ElementKey) -> Option<&ElementRecord> {
        self.partition(category).iter().find(|r| &r.key == key)
    }

    pub fn find_mut(
        &mut self,
        category: SubmissionCategory,
        key: &ElementKey,
    ) -> Option<&mut ElementRecord> {
        self.partition_mut(category).iter_mut().find(|r| &r.key == key)
    }

    pub fn len(&self) -> usize {
        self.piers.len() + self.columns.len() + self.beams.len() + self.drop_beams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Load a snapshot from a JSON file
    pub fn from_json_file(path: impl AsRef<std::path::Path>) -> crate::error::RecalcResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}
