//! Folds a successful batch response back into the baseline

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::baseline::BaselineSnapshot;
use crate::elements::{ElementKey, ElementType};
use crate::events::DerivedCache;
use crate::models::{ElementResult, RecalcResponse};

/// One element of a reconciled batch, typed as the service reported it
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciledElement {
    pub key: ElementKey,
    pub element_type: ElementType,
}

/// An element whose reported type differs from the type it was submitted as
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reclassification {
    pub key: ElementKey,
    pub requested: ElementType,
    pub reported: ElementType,
}

/// What changed after a successful batch, for the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    pub batch_id: Uuid,
    /// Submitted keys, all cleared from pending state
    pub changed_keys: Vec<ElementKey>,
    pub elements: Vec<ReconciledElement>,
    pub reclassified: Vec<Reclassification>,
    /// Submitted keys the response carried no result for
    pub missing_results: Vec<ElementKey>,
    /// Pending keys left out of the batch for lack of a baseline record
    pub stale_keys: Vec<ElementKey>,
    /// Pier/column/strut view needs re-filtering and re-sorting
    pub refresh_filtered_view: bool,
    pub rerender_beams: bool,
    pub rerender_drop_beams: bool,
}

impl ReconcileReport {
    fn new(batch_id: Uuid) -> Self {
        Self {
            batch_id,
            changed_keys: Vec::new(),
            elements: Vec::new(),
            reclassified: Vec::new(),
            missing_results: Vec::new(),
            stale_keys: Vec::new(),
            refresh_filtered_view: false,
            rerender_beams: false,
            rerender_drop_beams: false,
        }
    }

    /// Type the element should be presented as downstream
    pub fn element_type_of(&self, key: &ElementKey) -> Option<ElementType> {
        self.elements
            .iter()
            .find(|e| &e.key == key)
            .map(|e| e.element_type)
    }
}

pub struct ResultReconciler<'a> {
    cache: &'a dyn DerivedCache,
}

impl<'a> ResultReconciler<'a> {
    pub fn new(cache: &'a dyn DerivedCache) -> Self {
        Self { cache }
    }

    /// Apply `response` to `baseline` for every submitted key.
    ///
    /// `submitted` maps request-time types to the keys that went out in the
    /// batch.
    pub fn apply(
        &self,
        batch_id: Uuid,
        baseline: &mut BaselineSnapshot,
        response: &RecalcResponse,
        submitted: &BTreeMap<ElementType, Vec<ElementKey>>,
    ) -> ReconcileReport {
        let mut report = ReconcileReport::new(batch_id);

        for (&requested, keys) in submitted {
            let category = requested.category();
            for key in keys {
                let result = response.result_for(category, key);
                let reported = result.and_then(|r| r.element_type).unwrap_or(requested);

                match (result, baseline.find_mut(category, key)) {
                    (Some(result), Some(record)) => {
                        overlay_result(record, result, reported);
                    }
                    (None, _) => {
                        warn!("No result returned for {} '{}'", requested, key);
                        report.missing_results.push(key.clone());
                    }
                    (Some(_), None) => {
                        debug!("Baseline record for '{}' disappeared during the batch", key);
                    }
                }

                if reported != requested {
                    debug!("'{}' reclassified from {} to {}", key, requested, reported);
                    report.reclassified.push(Reclassification {
                        key: key.clone(),
                        requested,
                        reported,
                    });
                }

                match reported {
                    ElementType::Pier | ElementType::Column | ElementType::Strut => {
                        report.refresh_filtered_view = true
                    }
                    ElementType::Beam => report.rerender_beams = true,
                    ElementType::DropBeam => report.rerender_drop_beams = true,
                }

                self.cache.invalidate(key);
                report.changed_keys.push(key.clone());
                report.elements.push(ReconciledElement {
                    key: key.clone(),
                    element_type: reported,
                });
            }
        }

        report
    }
}

/// Overlay result fields onto a baseline record; absent fields are kept
fn overlay_result(
    record: &mut crate::baseline::ElementRecord,
    result: &ElementResult,
    reported: ElementType,
) {
    if let Some(reinforcement) = &result.reinforcement {
        record.overlay_source(reported.layout(), reinforcement);
    }
    for (field, value) in &result.outputs {
        record.fields.insert(field.clone(), value.clone());
    }
    if result.element_type.is_some() {
        record.element_type = Some(reported);
    }
}
