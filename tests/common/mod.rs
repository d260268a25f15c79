#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rebar_sync::prelude::*;
use rebar_sync::models::HealthResponse;
use serde_json::{Map, Value};
use tokio::sync::Notify;
use tokio::time::{sleep, timeout};

/// Scripted reply of the in-memory analysis service
pub enum Reply {
    Respond(RecalcResponse),
    Transport { status: u16, body: String },
    /// Signal `started`, then hold the response until `release` is notified
    Gated {
        started: Arc<Notify>,
        release: Arc<Notify>,
        response: RecalcResponse,
    },
}

#[derive(Default)]
pub struct ScriptedClient {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<RecalcRequest>>,
}

impl ScriptedClient {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn push(&self, reply: Reply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn requests(&self) -> Vec<RecalcRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnalysisClient for ScriptedClient {
    async fn recalculate(&self, request: &RecalcRequest) -> Result<RecalcResponse, ClientError> {
        self.requests.lock().unwrap().push(request.clone());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("no scripted reply left");

        match reply {
            Reply::Respond(response) => Ok(response),
            Reply::Transport { status, body } => Err(ClientError::ApiError { status, body }),
            Reply::Gated {
                started,
                release,
                response,
            } => {
                started.notify_one();
                release.notified().await;
                Ok(response)
            }
        }
    }

    async fn health(&self) -> Result<HealthResponse, ClientError> {
        Ok(HealthResponse {
            status: "healthy".to_string(),
            timestamp: None,
        })
    }
}

pub fn delta(value: Value) -> Map<String, Value> {
    value.as_object().cloned().expect("delta must be a JSON object")
}

pub fn key(name: &str) -> ElementKey {
    ElementKey::from(name)
}

/// Two stories worth of elements, one of each kind plus a strut
pub fn sample_baseline() -> BaselineSnapshot {
    serde_json::from_value(serde_json::json!({
        "piers": [
            {"key": "S2_P1", "diameterV": 8, "spacingV": 200, "cover": 25},
            {"key": "S2_P2", "diameterV": 12, "spacingV": null}
        ],
        "columns": [
            {"key": "S1_C1", "elementType": "column", "nBarsDepth": 4, "nBarsWidth": 4, "diameter": 20},
            {"key": "S1_ST1", "elementType": "strut", "nBarsDepth": 1, "nBarsWidth": 1, "diameter": 12}
        ],
        "beams": [
            {"key": "S2_B1", "reinforcement": {"nBarsTop": 3, "nBarsBottom": 3, "diameterTop": 16}}
        ],
        "dropBeams": [
            {"key": "S2_DB1", "nBarsTop": 4}
        ]
    }))
    .expect("valid baseline")
}

/// Wait until no batch is outstanding on `session`
pub async fn wait_until_idle(session: &EditSession) {
    timeout(Duration::from_secs(2), async {
        while session.is_in_flight().await {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("timed out waiting for the batch to finish");
}
