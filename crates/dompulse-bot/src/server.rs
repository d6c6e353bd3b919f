//! Liveness and manual-trigger HTTP surface.
//!
//! `GET /` answers uptime monitors with a bare "OK". `POST /trigger` runs
//! one dispatch cycle synchronously and maps its outcome onto the status
//! code. Manual cycles may overlap scheduled ones; the dispatch policy is
//! stateless, so both are allowed to send.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::info;

use dompulse_core::{CycleOutcome, DispatchPolicy};

#[derive(Clone)]
pub struct AppState {
    pub policy: Arc<DispatchPolicy>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(liveness))
        .route("/trigger", post(trigger))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct TriggerResponse {
    status: &'static str,
    cycle_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

async fn liveness() -> &'static str {
    "OK"
}

async fn trigger(State(state): State<AppState>) -> (StatusCode, Json<TriggerResponse>) {
    info!("manual trigger received");
    let report = state.policy.run_cycle().await;

    match report.outcome {
        CycleOutcome::Sent => (
            StatusCode::OK,
            Json(TriggerResponse {
                status: "sent",
                cycle_id: report.cycle_id.to_string(),
                detail: None,
            }),
        ),
        CycleOutcome::Exhausted { last_error } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(TriggerResponse {
                status: "failed",
                cycle_id: report.cycle_id.to_string(),
                detail: Some(last_error),
            }),
        ),
    }
}
