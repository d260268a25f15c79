//! HTTP surface over one edit session

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::baseline::BaselineSnapshot;
use crate::changes::{BeamSide, ChangeEntry};
use crate::coordinator::{RecalcPhase, RecalculationCoordinator, RunOutcome};
use crate::elements::{ElementKey, ElementType};
use crate::error::RecalcError;

pub type SharedCoordinator = Arc<RecalculationCoordinator>;

/// Build the API router
pub fn create_router(coordinator: SharedCoordinator) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/pending", get(pending_handler))
        .route("/api/v1/changes/reinforcement", post(reinforcement_handler))
        .route("/api/v1/changes/beam-assignment", post(beam_assignment_handler))
        .route("/api/v1/changes/:key", delete(discard_handler))
        .route("/api/v1/recalculate", post(recalculate_handler))
        .route("/api/v1/reset", post(reset_handler))
        .route("/api/v1/baseline", get(get_baseline_handler).put(put_baseline_handler))
        .layer(cors)
        .with_state(coordinator)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReinforcementChangeBody {
    pub key: ElementKey,
    pub element_type: ElementType,
    #[serde(default)]
    pub delta: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeamAssignmentBody {
    pub pier_key: ElementKey,
    pub side: BeamSide,
    pub beam_key: ElementKey,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingChange {
    pub key: ElementKey,
    pub change: ChangeEntry,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingResponse {
    pub in_flight: bool,
    pub phase: RecalcPhase,
    pub pending: Vec<PendingChange>,
}

async fn health_check(State(coordinator): State<SharedCoordinator>) -> Json<Value> {
    let analysis_available = coordinator.client().health().await.is_ok();

    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "analysis_available": analysis_available,
    }))
}

async fn pending_handler(State(coordinator): State<SharedCoordinator>) -> Json<PendingResponse> {
    let session = coordinator.session();
    let pending = session
        .pending_changes()
        .await
        .into_iter()
        .map(|(key, change)| PendingChange { key, change })
        .collect();

    Json(PendingResponse {
        in_flight: session.is_in_flight().await,
        phase: session.phase().await,
        pending,
    })
}

async fn reinforcement_handler(
    State(coordinator): State<SharedCoordinator>,
    Json(body): Json<ReinforcementChangeBody>,
) -> Json<Value> {
    tracing::info!("Reinforcement change on {} '{}'", body.element_type, body.key);
    let session = coordinator.session();
    session
        .record_reinforcement_change(body.key.clone(), body.element_type, body.delta)
        .await;

    Json(json!({ "key": body.key, "pending": true }))
}

async fn beam_assignment_handler(
    State(coordinator): State<SharedCoordinator>,
    Json(body): Json<BeamAssignmentBody>,
) -> Result<Json<Value>, ApiError> {
    tracing::info!(
        "Beam assignment on pier '{}': {:?} -> '{}'",
        body.pier_key,
        body.side,
        body.beam_key
    );
    coordinator
        .session()
        .record_beam_assignment(body.pier_key.clone(), body.side, body.beam_key)
        .await?;

    Ok(Json(json!({ "key": body.pier_key, "pending": true })))
}

async fn discard_handler(
    State(coordinator): State<SharedCoordinator>,
    Path(key): Path<String>,
) -> Json<Value> {
    let key = ElementKey::from(key);
    let discarded = coordinator.session().discard(&key).await;
    Json(json!({ "key": key, "discarded": discarded }))
}

async fn recalculate_handler(State(coordinator): State<SharedCoordinator>) -> Json<RunOutcome> {
    Json(coordinator.run().await)
}

async fn reset_handler(State(coordinator): State<SharedCoordinator>) -> Json<Value> {
    coordinator.session().reset().await;
    Json(json!({ "reset": true }))
}

async fn get_baseline_handler(State(coordinator): State<SharedCoordinator>) -> Json<BaselineSnapshot> {
    Json(coordinator.session().baseline().await)
}

async fn put_baseline_handler(
    State(coordinator): State<SharedCoordinator>,
    Json(baseline): Json<BaselineSnapshot>,
) -> Json<Value> {
    let elements = baseline.len();
    coordinator.session().load_baseline(baseline).await;
    Json(json!({ "loaded": elements }))
}

/// API Errors
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<RecalcError> for ApiError {
    fn from(err: RecalcError) -> Self {
        match err {
            RecalcError::InvalidElementType { .. } | RecalcError::InvalidInput(_) => {
                ApiError::ValidationError(err.to_string())
            }
            other => ApiError::InternalError(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
