#![cfg(feature = "server")]

mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use common::{sample_baseline, Reply, ScriptedClient};
use rebar_sync::api::create_router;
use rebar_sync::prelude::*;
use serde_json::{json, Value};
use tower::ServiceExt;

fn app(client: Arc<ScriptedClient>) -> Router {
    let coordinator =
        RecalculationCoordinator::new(EditSession::new(sample_baseline()), client, "session-1");
    create_router(Arc::new(coordinator))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(match body {
            Some(body) => Body::from(body.to_string()),
            None => Body::empty(),
        })
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_edit_then_recalculate() {
    let client = ScriptedClient::new([Reply::Respond(RecalcResponse::succeeded(vec![
        ElementResult::new("S2_P1").with_reinforcement(json!({"diameterV": 10})),
    ]))]);
    let app = app(client.clone());

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/changes/reinforcement",
        Some(json!({"key": "S2_P1", "elementType": "pier", "delta": {"diameterV": 10}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, pending) = send(&app, "GET", "/api/v1/pending", None).await;
    assert_eq!(pending["inFlight"], json!(false));
    assert_eq!(pending["phase"], json!("idle"));
    assert_eq!(pending["pending"][0]["key"], json!("S2_P1"));
    assert_eq!(
        pending["pending"][0]["change"]["reinforcementDelta"]["diameterV"],
        json!(10)
    );

    let (status, outcome) = send(&app, "POST", "/api/v1/recalculate", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["outcome"], json!("applied"));
    assert_eq!(outcome["changedKeys"], json!(["S2_P1"]));

    let (_, pending) = send(&app, "GET", "/api/v1/pending", None).await;
    assert_eq!(pending["pending"], json!([]));

    let (_, baseline) = send(&app, "GET", "/api/v1/baseline", None).await;
    assert_eq!(baseline["piers"][0]["diameterV"], json!(10));
    assert_eq!(client.requests().len(), 1);
}

#[tokio::test]
async fn test_beam_assignment_on_column_is_rejected() {
    let app = app(ScriptedClient::new([]));

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/changes/beam-assignment",
        Some(json!({"pierKey": "S1_C1", "side": "left", "beamKey": "S2_B1"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("S1_C1"));

    let (_, pending) = send(&app, "GET", "/api/v1/pending", None).await;
    assert_eq!(pending["pending"], json!([]));
}

#[tokio::test]
async fn test_failed_recalculation_keeps_pending() {
    let client = ScriptedClient::new([Reply::Respond(RecalcResponse::failed("bad input"))]);
    let app = app(client);

    send(
        &app,
        "POST",
        "/api/v1/changes/beam-assignment",
        Some(json!({"pierKey": "S2_P1", "side": "right", "beamKey": "S2_B1"})),
    )
    .await;

    let (_, outcome) = send(&app, "POST", "/api/v1/recalculate", None).await;
    assert_eq!(outcome["outcome"], json!("preserved"));
    assert_eq!(outcome["kind"], json!({"kind": "application", "message": "bad input"}));

    let (_, pending) = send(&app, "GET", "/api/v1/pending", None).await;
    assert_eq!(pending["pending"][0]["change"]["beamAssignment"]["right"], json!("S2_B1"));
}

#[tokio::test]
async fn test_discard_and_reset() {
    let app = app(ScriptedClient::new([]));

    for key in ["S2_P1", "S1_C1"] {
        send(
            &app,
            "POST",
            "/api/v1/changes/reinforcement",
            Some(json!({"key": key, "elementType": "column", "delta": {}})),
        )
        .await;
    }

    let (_, body) = send(&app, "DELETE", "/api/v1/changes/S2_P1", None).await;
    assert_eq!(body["discarded"], json!(true));
    let (_, pending) = send(&app, "GET", "/api/v1/pending", None).await;
    assert_eq!(pending["pending"].as_array().unwrap().len(), 1);

    send(&app, "POST", "/api/v1/reset", None).await;
    let (_, pending) = send(&app, "GET", "/api/v1/pending", None).await;
    assert_eq!(pending["pending"], json!([]));

    let (_, outcome) = send(&app, "POST", "/api/v1/recalculate", None).await;
    assert_eq!(outcome, json!({"outcome": "skipped", "reason": "nothing_pending"}));
}

#[tokio::test]
async fn test_put_baseline_reloads_session() {
    let app = app(ScriptedClient::new([]));
    send(
        &app,
        "POST",
        "/api/v1/changes/reinforcement",
        Some(json!({"key": "S2_P1", "elementType": "pier", "delta": {"cover": 30}})),
    )
    .await;

    let (status, body) = send(
        &app,
        "PUT",
        "/api/v1/baseline",
        Some(json!({"piers": [{"key": "S3_P1"}]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["loaded"], json!(1));

    let (_, pending) = send(&app, "GET", "/api/v1/pending", None).await;
    assert_eq!(pending["pending"], json!([]));
    let (_, baseline) = send(&app, "GET", "/api/v1/baseline", None).await;
    assert_eq!(baseline["piers"][0]["key"], json!("S3_P1"));
}

#[tokio::test]
async fn test_health_reports_analysis_service() {
    let app = app(ScriptedClient::new([]));
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["analysis_available"], json!(true));
    assert!(body["timestamp"].as_str().is_some_and(|ts| ts.contains('T')));
}
