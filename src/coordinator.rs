//! Drives one batched recalculation cycle
//!
//! `run()` snapshots the pending keys, builds the update payload, submits it
//! once and then either folds the response into the baseline and clears the
//! submitted keys, or leaves all pending state untouched for a retry.
//!
//! # Error Handling
//!
//! - `success: false` from the service: application failure, state preserved
//! - Network error, non-2xx or undecodable body: transport failure, state preserved
//!
//! Neither is returned as an `Err`; both come back as [`RunOutcome::Preserved`]
//! and are emitted to the [`RecalcSink`].

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::client::AnalysisClient;
use crate::config::RecalcConfig;
use crate::elements::ElementKey;
use crate::events::{DerivedCache, NoopCache, NoopSink, RecalcEvent, RecalcSink};
use crate::models::{AnalysisOptions, RecalcRequest};
use crate::payload::UpdatePayloadBuilder;
use crate::reconciler::{ReconcileReport, ResultReconciler};
use crate::session::EditSession;

/// Current step of the submission cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecalcPhase {
    #[default]
    Idle,
    Building,
    AwaitingResponse,
    ApplyingSuccess,
    PreservingFailure,
}

/// Why a failed batch failed; only the user-facing message differs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum FailureKind {
    /// The service answered with `success: false`
    Application(String),
    /// The service could not be reached or answered unintelligibly
    Transport(String),
}

/// A batch that failed; all of its keys are still pending
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecalcFailure {
    pub batch_id: Uuid,
    pub kind: FailureKind,
    pub preserved_keys: Vec<ElementKey>,
}

impl RecalcFailure {
    pub fn user_message(&self) -> String {
        match &self.kind {
            FailureKind::Application(message) => format!("analysis error: {}", message),
            FailureKind::Transport(_) => "connection error, changes retained".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NothingPending,
    InFlight,
}

/// Result of a call to [`RecalculationCoordinator::run`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    Skipped { reason: SkipReason },
    Applied(ReconcileReport),
    Preserved(RecalcFailure),
    /// The session was reset or reloaded while the batch was in flight; the
    /// response was dropped without touching the new session's state
    Superseded { batch_id: Uuid },
}

impl RunOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, RunOutcome::Applied(_))
    }
}

#[derive(Clone)]
pub struct RecalculationCoordinator {
    session: EditSession,
    client: Arc<dyn AnalysisClient>,
    sink: Arc<dyn RecalcSink>,
    cache: Arc<dyn DerivedCache>,
    session_id: String,
    options: AnalysisOptions,
}

impl RecalculationCoordinator {
    pub fn new(
        session: EditSession,
        client: Arc<dyn AnalysisClient>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            session,
            client,
            sink: Arc::new(NoopSink),
            cache: Arc::new(NoopCache),
            session_id: session_id.into(),
            options: AnalysisOptions::default(),
        }
    }

    pub fn from_config(
        config: &RecalcConfig,
        session: EditSession,
        client: Arc<dyn AnalysisClient>,
    ) -> Self {
        Self::new(session, client, config.session_id.clone()).with_options(config.options.clone())
    }

    pub fn with_sink(mut self, sink: Arc<dyn RecalcSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn DerivedCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_options(mut self, options: AnalysisOptions) -> Self {
        self.options = options;
        self
    }

    pub fn session(&self) -> &EditSession {
        &self.session
    }

    pub fn client(&self) -> &Arc<dyn AnalysisClient> {
        &self.client
    }

    /// Submit every pending change in one batch.
    ///
    /// A trigger while a batch is outstanding is ignored, not queued. Edits
    /// recorded while the request is in flight stay pending for the next run.
    ///
    /// The cycle runs on its own task: dropping the returned future does not
    /// abandon a batch mid-flight, it still completes and is emitted to the
    /// sink.
    pub async fn run(&self) -> RunOutcome {
        let batch_id = Uuid::new_v4();
        let cycle = self.clone();

        match tokio::spawn(async move { cycle.run_cycle(batch_id).await }).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!("Batch {} task failed: {}", batch_id, err);
                let mut state = self.session.lock().await;
                state.pending.set_in_flight(false);
                state.phase = RecalcPhase::Idle;
                RunOutcome::Preserved(RecalcFailure {
                    batch_id,
                    kind: FailureKind::Transport(err.to_string()),
                    preserved_keys: state.pending.snapshot_keys(),
                })
            }
        }
    }

    async fn run_cycle(&self, batch_id: Uuid) -> RunOutcome {
        let (request, submitted, stale_keys, generation) = {
            let mut state = self.session.lock().await;
            if state.pending.is_empty() {
                return RunOutcome::Skipped {
                    reason: SkipReason::NothingPending,
                };
            }
            if state.pending.is_in_flight() {
                debug!("Recalculation already in flight, ignoring trigger");
                return RunOutcome::Skipped {
                    reason: SkipReason::InFlight,
                };
            }

            state.phase = RecalcPhase::Building;
            let generation = state.generation;
            let keys = state.pending.snapshot_keys();
            let updates = UpdatePayloadBuilder::new(&state.changes, &state.baseline).build(&keys);

            let mut submitted = state.changes.partition_by_type(&keys);
            for partition in submitted.values_mut() {
                partition.retain(|key| updates.contains_key(key));
            }
            submitted.retain(|_, partition| !partition.is_empty());
            let stale_keys: Vec<ElementKey> = keys
                .into_iter()
                .filter(|key| !updates.contains_key(key))
                .collect();

            info!(
                "Batch {}: submitting {} piers, {} columns, {} beams, {} drop beams ({} stale)",
                batch_id,
                updates.pier_updates.len(),
                updates.column_updates.len(),
                updates.beam_updates.len(),
                updates.drop_beam_updates.len(),
                stale_keys.len()
            );

            let request = RecalcRequest {
                session_id: self.session_id.clone(),
                updates,
                options: self.options.clone(),
            };

            state.pending.set_in_flight(true);
            state.phase = RecalcPhase::AwaitingResponse;
            (request, submitted, stale_keys, generation)
        };

        let response = self.client.recalculate(&request).await;

        let mut state = self.session.lock().await;
        if state.generation != generation {
            info!("Batch {}: session was reset or reloaded while in flight, dropping response", batch_id);
            state.pending.set_in_flight(false);
            state.phase = RecalcPhase::Idle;
            return RunOutcome::Superseded { batch_id };
        }

        let outcome = match response {
            Ok(response) if response.success => {
                state.phase = RecalcPhase::ApplyingSuccess;
                let state = &mut *state;
                let mut report = ResultReconciler::new(self.cache.as_ref()).apply(
                    batch_id,
                    &mut state.baseline,
                    &response,
                    &submitted,
                );
                state.clear_keys(&report.changed_keys);
                report.stale_keys = stale_keys;
                info!(
                    "Batch {}: reconciled {} element(s), {} still pending",
                    batch_id,
                    report.changed_keys.len(),
                    state.pending.len()
                );
                RunOutcome::Applied(report)
            }
            Ok(response) => {
                let message = response
                    .error
                    .unwrap_or_else(|| "analysis service reported failure".to_string());
                self.preserve(&mut state.phase, batch_id, FailureKind::Application(message), &request)
            }
            Err(err) => {
                self.preserve(&mut state.phase, batch_id, FailureKind::Transport(err.to_string()), &request)
            }
        };

        state.pending.set_in_flight(false);
        state.phase = RecalcPhase::Idle;
        drop(state);

        let event = match &outcome {
            RunOutcome::Applied(report) => Some(RecalcEvent::Reconciled(report.clone())),
            RunOutcome::Preserved(failure) => Some(RecalcEvent::Failed(failure.clone())),
            RunOutcome::Skipped { .. } | RunOutcome::Superseded { .. } => None,
        };
        if let Some(event) = event {
            self.sink.emit(event);
        }
        outcome
    }

    fn preserve(
        &self,
        phase: &mut RecalcPhase,
        batch_id: Uuid,
        kind: FailureKind,
        request: &RecalcRequest,
    ) -> RunOutcome {
        *phase = RecalcPhase::PreservingFailure;
        warn!("Batch {} failed, keeping changes pending: {:?}", batch_id, kind);
        RunOutcome::Preserved(RecalcFailure {
            batch_id,
            kind,
            preserved_keys: request.updates.keys().cloned().collect(),
        })
    }
}
