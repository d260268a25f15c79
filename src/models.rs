//! Wire types for the analysis service recalculation call

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::elements::{ElementKey, ElementType, SubmissionCategory};
use crate::payload::UpdatePayload;

/// Fixed analysis options sent with every batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisOptions {
    pub generate_plots: bool,
    pub moment_axis: String,
    pub angle_deg: i32,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            generate_plots: true,
            moment_axis: "M3".to_string(),
            angle_deg: 0,
        }
    }
}

/// Batched recalculation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecalcRequest {
    pub session_id: String,
    #[serde(flatten)]
    pub updates: UpdatePayload,
    #[serde(flatten)]
    pub options: AnalysisOptions,
}

/// Per-element result returned by the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementResult {
    pub key: ElementKey,
    /// Type as classified by the service, may differ from the request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_type: Option<ElementType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reinforcement: Option<Map<String, Value>>,
    /// Capacity ratios, plots and other computed outputs
    #[serde(flatten)]
    pub outputs: Map<String, Value>,
}

impl ElementResult {
    pub fn new(key: impl Into<ElementKey>) -> Self {
        Self {
            key: key.into(),
            element_type: None,
            reinforcement: None,
            outputs: Map::new(),
        }
    }

    pub fn with_type(mut self, element_type: ElementType) -> Self {
        self.element_type = Some(element_type);
        self
    }

    pub fn with_reinforcement(mut self, reinforcement: Value) -> Self {
        self.reinforcement = reinforcement.as_object().cloned();
        self
    }

    pub fn with_output(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.outputs.insert(name.to_string(), value.into());
        self
    }
}

/// Response body of the recalculation call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecalcResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Pier, column and strut results
    #[serde(default)]
    pub results: Vec<ElementResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beam_results: Option<Vec<ElementResult>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drop_beam_results: Option<Vec<ElementResult>>,
}

impl RecalcResponse {
    pub fn succeeded(results: Vec<ElementResult>) -> Self {
        Self {
            success: true,
            results,
            ..Self::default()
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }

    /// Find the result for `key`, looking in the category's own collection
    /// before the shared `results` list.
    pub fn result_for(&self, category: SubmissionCategory, key: &ElementKey) -> Option<&ElementResult> {
        let dedicated = match category {
            SubmissionCategory::Beams => self.beam_results.as_deref(),
            SubmissionCategory::DropBeams => self.drop_beam_results.as_deref(),
            _ => None,
        };
        dedicated
            .unwrap_or_default()
            .iter()
            .chain(&self.results)
            .find(|r| &r.key == key)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}
