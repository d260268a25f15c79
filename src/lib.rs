//! rebar-sync - batches reinforcement edits and submits them for recalculation
//!
//! Users edit reinforcement parameters and pier coupling-beam assignments on
//! piers, columns, struts, beams and drop beams loaded from an analysis
//! session. Edits accumulate per element and go to the analysis service in a
//! single batched request when recalculation is triggered:
//! - A successful batch is folded back into the baseline and its keys cleared
//! - A failed batch leaves every pending change in place for a retry
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use rebar_sync::prelude::*;
//! use serde_json::json;
//!
//! # async fn demo(baseline: BaselineSnapshot) {
//! let session = EditSession::new(baseline);
//! let client = Arc::new(HttpAnalysisClient::new("http://127.0.0.1:8084"));
//! let coordinator = RecalculationCoordinator::new(session.clone(), client, "session-1");
//!
//! let delta = json!({"diameterV": 10}).as_object().cloned().unwrap_or_default();
//! session.record_reinforcement_change("S2_P1", ElementType::Pier, delta).await;
//!
//! match coordinator.run().await {
//!     RunOutcome::Applied(report) => println!("updated {:?}", report.changed_keys),
//!     RunOutcome::Preserved(failure) => println!("{}", failure.user_message()),
//!     _ => {}
//! }
//! # }
//! ```

pub mod baseline;
pub mod changes;
pub mod client;
pub mod config;
pub mod coordinator;
pub mod elements;
pub mod error;
pub mod events;
pub mod models;
pub mod payload;
pub mod reconciler;
pub mod session;

#[cfg(feature = "server")]
pub mod api;

// Re-export common types
pub mod prelude {
    pub use crate::baseline::{BaselineSnapshot, ElementRecord};
    pub use crate::changes::{BeamAssignment, BeamSide, ChangeEntry, ChangeStore, PendingSet};
    pub use crate::client::{AnalysisClient, ClientError, HttpAnalysisClient};
    pub use crate::config::RecalcConfig;
    pub use crate::coordinator::{
        FailureKind, RecalcFailure, RecalcPhase, RecalculationCoordinator, RunOutcome, SkipReason,
    };
    pub use crate::elements::{ElementKey, ElementType, FieldSchema, SubmissionCategory};
    pub use crate::error::{RecalcError, RecalcResult};
    pub use crate::events::{DerivedCache, RecalcEvent, RecalcSink};
    pub use crate::models::{AnalysisOptions, ElementResult, RecalcRequest, RecalcResponse};
    pub use crate::payload::{ElementUpdate, UpdatePayload, UpdatePayloadBuilder};
    pub use crate::reconciler::{ReconcileReport, ResultReconciler};
    pub use crate::session::EditSession;
}
