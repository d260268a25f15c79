//! Shared edit state for one analysis session
//!
//! The change store, the pending set and the baseline snapshot sit behind a
//! single lock. Every mutation of the store goes through [`EditSession`],
//! which updates the pending set in the same critical section, so a key is
//! pending exactly when it has a change entry.

use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use crate::baseline::BaselineSnapshot;
use crate::changes::{BeamSide, ChangeEntry, ChangeStore, PendingSet};
use crate::coordinator::RecalcPhase;
use crate::elements::{ElementKey, ElementType, SubmissionCategory};
use crate::error::{RecalcError, RecalcResult};

#[derive(Debug, Default)]
pub(crate) struct SessionState {
    pub(crate) changes: ChangeStore,
    pub(crate) pending: PendingSet,
    pub(crate) baseline: BaselineSnapshot,
    pub(crate) phase: RecalcPhase,
    /// Bumped on reset and reload; a batch built under an older generation
    /// must not touch the current state
    pub(crate) generation: u64,
}

impl SessionState {
    pub(crate) fn clear_keys(&mut self, keys: &[ElementKey]) {
        self.changes.remove_all(keys);
        self.pending.remove_all(keys);
    }

    /// Type of `key` according to the baseline, if it is loaded
    fn baseline_type(&self, key: &ElementKey) -> Option<ElementType> {
        [
            SubmissionCategory::Piers,
            SubmissionCategory::Columns,
            SubmissionCategory::Beams,
            SubmissionCategory::DropBeams,
        ]
        .into_iter()
        .find_map(|category| {
            self.baseline.find(category, key).map(|record| {
                record.element_type.unwrap_or(match category {
                    SubmissionCategory::Piers => ElementType::Pier,
                    SubmissionCategory::Columns => ElementType::Column,
                    SubmissionCategory::Beams => ElementType::Beam,
                    SubmissionCategory::DropBeams => ElementType::DropBeam,
                })
            })
        })
    }
}

/// Cloneable handle to the edit state of one session
#[derive(Debug, Clone, Default)]
pub struct EditSession {
    inner: Arc<Mutex<SessionState>>,
}

impl EditSession {
    pub fn new(baseline: BaselineSnapshot) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SessionState {
                baseline,
                ..SessionState::default()
            })),
        }
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.inner.lock().await
    }

    /// Record a reinforcement edit and mark the element pending
    pub async fn record_reinforcement_change(
        &self,
        key: impl Into<ElementKey>,
        element_type: ElementType,
        delta: Map<String, Value>,
    ) {
        let key = key.into();
        let mut state = self.lock().await;
        debug!("Recording {} field(s) on {} '{}'", delta.len(), element_type, key);
        state
            .changes
            .record_reinforcement_change(key.clone(), element_type, delta);
        state.pending.add(key);
    }

    /// Record a coupling beam replacement on one side of a pier
    pub async fn record_beam_assignment(
        &self,
        pier_key: impl Into<ElementKey>,
        side: BeamSide,
        beam_key: impl Into<ElementKey>,
    ) -> RecalcResult<()> {
        let pier_key = pier_key.into();
        let mut state = self.lock().await;

        if let Some(actual) = state.baseline_type(&pier_key) {
            if actual != ElementType::Pier {
                return Err(RecalcError::InvalidElementType {
                    key: pier_key,
                    actual,
                });
            }
        }

        state
            .changes
            .record_beam_assignment(pier_key.clone(), side, beam_key.into())?;
        state.pending.add(pier_key);
        Ok(())
    }

    /// Drop the pending edit for one element. Returns whether one existed.
    pub async fn discard(&self, key: &ElementKey) -> bool {
        let mut state = self.lock().await;
        let existed = state.changes.remove(key).is_some();
        state.pending.remove(key);
        existed
    }

    /// Drop every pending edit. A batch already in flight is left to finish
    /// but its response is discarded.
    pub async fn reset(&self) {
        let mut state = self.lock().await;
        info!("Resetting {} pending change(s)", state.changes.len());
        state.changes.clear();
        state.pending.clear();
        state.generation = state.generation.wrapping_add(1);
    }

    /// Replace the baseline (session reload) and drop every pending edit
    pub async fn load_baseline(&self, baseline: BaselineSnapshot) {
        let mut state = self.lock().await;
        info!("Loading baseline with {} element(s)", baseline.len());
        state.baseline = baseline;
        state.changes.clear();
        state.pending.clear();
        state.generation = state.generation.wrapping_add(1);
    }

    pub async fn pending_keys(&self) -> Vec<ElementKey> {
        self.lock().await.pending.snapshot_keys()
    }

    pub async fn change_for(&self, key: &ElementKey) -> Option<ChangeEntry> {
        self.lock().await.changes.get(key).cloned()
    }

    /// Pending keys with their change entries, in pending order
    pub async fn pending_changes(&self) -> Vec<(ElementKey, ChangeEntry)> {
        let state = self.lock().await;
        state
            .pending
            .snapshot_keys()
            .into_iter()
            .filter_map(|key| state.changes.get(&key).cloned().map(|entry| (key, entry)))
            .collect()
    }

    pub async fn is_pending(&self, key: &ElementKey) -> bool {
        self.lock().await.pending.contains(key)
    }

    pub async fn has_pending(&self) -> bool {
        !self.lock().await.pending.is_empty()
    }

    pub async fn is_in_flight(&self) -> bool {
        self.lock().await.pending.is_in_flight()
    }

    pub async fn phase(&self) -> RecalcPhase {
        self.lock().await.phase
    }

    /// Copy of the current baseline
    pub async fn baseline(&self) -> BaselineSnapshot {
        self.lock().await.baseline.clone()
    }

    /// Read the baseline without copying it
    pub async fn with_baseline<R>(&self, f: impl FnOnce(&BaselineSnapshot) -> R) -> R {
        f(&self.lock().await.baseline)
    }
}
