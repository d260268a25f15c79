//! Outbound notifications to the presentation layer and derived caches

use std::sync::Mutex;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::coordinator::RecalcFailure;
use crate::elements::ElementKey;
use crate::reconciler::ReconcileReport;

/// Structured outcome of a submission, emitted once per batch
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RecalcEvent {
    Reconciled(ReconcileReport),
    Failed(RecalcFailure),
}

/// Listener attached by the presentation layer
pub trait RecalcSink: Send + Sync {
    fn emit(&self, event: RecalcEvent);
}

/// Per-element memoized data (combination breakdowns, plots) owned outside
/// the edit session
pub trait DerivedCache: Send + Sync {
    fn invalidate(&self, key: &ElementKey);
}

/// Drops every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl RecalcSink for NoopSink {
    fn emit(&self, _event: RecalcEvent) {}
}

/// Ignores invalidations
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCache;

impl DerivedCache for NoopCache {
    fn invalidate(&self, _key: &ElementKey) {}
}

impl RecalcSink for mpsc::UnboundedSender<RecalcEvent> {
    fn emit(&self, event: RecalcEvent) {
        if self.send(event).is_err() {
            debug!("Recalc event receiver dropped");
        }
    }
}

/// Keeps every event in memory, mostly useful for tests and replay
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<RecalcEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RecalcEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl RecalcSink for RecordingSink {
    fn emit(&self, event: RecalcEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => {
                warn!("Recording sink lock poisoned, recovering");
                poisoned.into_inner().push(event);
            }
        }
    }
}

/// Records invalidated keys in call order
#[derive(Debug, Default)]
pub struct RecordingCache {
    invalidated: Mutex<Vec<ElementKey>>,
}

impl RecordingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invalidated(&self) -> Vec<ElementKey> {
        match self.invalidated.lock() {
            Ok(keys) => keys.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl DerivedCache for RecordingCache {
    fn invalidate(&self, key: &ElementKey) {
        match self.invalidated.lock() {
            Ok(mut keys) => keys.push(key.clone()),
            Err(poisoned) => poisoned.into_inner().push(key.clone()),
        }
    }
}
