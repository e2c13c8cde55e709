use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Utc};
use outletdb_ingest::GateDecision;
use serde::Serialize;

use crate::middleware::RequestId;

use super::{ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub(super) struct StatusData {
    pub last_ingested_at: Option<DateTime<Utc>>,
    pub stale: bool,
    pub freshness_window_secs: u64,
    pub stage: &'static str,
}

pub(super) async fn get_status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<StatusData>> {
    let decision = state.gate.check(Utc::now()).await;
    let last_ingested_at = match decision {
        GateDecision::Fresh { last_ingested_at } => Some(last_ingested_at),
        GateDecision::Stale { last_ingested_at } => last_ingested_at,
    };
    let stage = *state.stage.borrow();

    Json(ApiResponse::new(
        StatusData {
            last_ingested_at,
            stale: decision.is_stale(),
            freshness_window_secs: state.gate.window().as_secs(),
            stage: stage.as_str(),
        },
        req_id.0,
    ))
}
