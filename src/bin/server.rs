//! Edit session HTTP server

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rebar_sync::api;
use rebar_sync::prelude::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rebar_sync=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting reinforcement edit service");

    let config = RecalcConfig::from_env()?;
    tracing::info!("Analysis service: {}{}", config.analysis_url, config.endpoint);
    tracing::info!("Session: {}", config.session_id);

    let baseline = match &config.baseline_path {
        Some(path) => {
            let snapshot = BaselineSnapshot::from_json_file(path)?;
            tracing::info!("Loaded {} baseline element(s) from {:?}", snapshot.len(), path);
            snapshot
        }
        None => {
            tracing::warn!("BASELINE_PATH not set, starting with an empty baseline");
            BaselineSnapshot::new()
        }
    };

    let client = HttpAnalysisClient::from_config(&config);
    match client.health().await {
        Ok(health) => tracing::info!("Analysis service reachable: {}", health.status),
        Err(e) => {
            tracing::warn!("Analysis service not reachable: {}", e);
            tracing::warn!("Edits will be accepted but recalculation fails until it is available");
        }
    }

    let (events_tx, mut events_rx) = mpsc::unbounded_channel::<RecalcEvent>();
    tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            match event {
                RecalcEvent::Reconciled(report) => tracing::info!(
                    "Batch {} reconciled: {} element(s), {} reclassified",
                    report.batch_id,
                    report.changed_keys.len(),
                    report.reclassified.len()
                ),
                RecalcEvent::Failed(failure) => tracing::warn!(
                    "Batch {}: {}",
                    failure.batch_id,
                    failure.user_message()
                ),
            }
        }
    });

    let coordinator = RecalculationCoordinator::from_config(
        &config,
        EditSession::new(baseline),
        Arc::new(client),
    )
    .with_sink(Arc::new(events_tx));

    let app = api::create_router(Arc::new(coordinator));

    let addr = config.bind_addr();
    tracing::info!("Listening on {}", addr);
    tracing::info!("API endpoints:");
    tracing::info!("  GET    /health");
    tracing::info!("  GET    /api/v1/pending");
    tracing::info!("  POST   /api/v1/changes/reinforcement");
    tracing::info!("  POST   /api/v1/changes/beam-assignment");
    tracing::info!("  DELETE /api/v1/changes/:key");
    tracing::info!("  POST   /api/v1/recalculate");
    tracing::info!("  POST   /api/v1/reset");
    tracing::info!("  GET    /api/v1/baseline");
    tracing::info!("  PUT    /api/v1/baseline");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
