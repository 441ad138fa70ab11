//! Prometheus metrics
//!
//! Counters are fed from the engine's broadcast events so the engine
//! itself stays free of metrics plumbing.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tokio::sync::broadcast;

use callflow_engine::EngineEvent;
use callflow_scoring::HOT_THRESHOLD;

use crate::state::AppState;

/// Install the Prometheus recorder
///
/// Returns `None` when a recorder is already installed (tests spinning up
/// multiple servers in one process).
pub fn init_metrics() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(error = %e, "metrics recorder not installed");
            None
        }
    }
}

/// `/metrics` endpoint
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}

pub fn record_webhook_event(kind: &'static str, applied: bool) {
    counter!(
        "callflow_webhook_events_total",
        "kind" => kind,
        "applied" => if applied { "true" } else { "false" }
    )
    .increment(1);
}

/// Translate engine lifecycle events into metrics until the engine drops
pub fn spawn_engine_metrics(mut events: broadcast::Receiver<EngineEvent>) {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(EngineEvent::CallStarted { .. }) => {
                    counter!("callflow_calls_started_total").increment(1);
                }
                Ok(EngineEvent::CallConnected { .. }) => {
                    counter!("callflow_calls_connected_total").increment(1);
                }
                Ok(EngineEvent::FunctionInvoked { name, .. }) => {
                    counter!("callflow_function_invocations_total", "function" => name)
                        .increment(1);
                }
                Ok(EngineEvent::CallFinalized {
                    outcome,
                    motivation_score,
                    ..
                }) => {
                    counter!("callflow_calls_finalized_total", "outcome" => outcome.as_str())
                        .increment(1);
                    if let Some(score) = motivation_score {
                        histogram!("callflow_motivation_score").record(score as f64);
                        if score >= HOT_THRESHOLD {
                            counter!("callflow_hot_leads_total").increment(1);
                        }
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "metrics task lagged behind engine events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}
