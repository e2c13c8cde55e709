use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState, ErrorCode};

#[derive(Debug, Deserialize)]
pub(super) struct DistanceQuery {
    pub a: Uuid,
    pub b: Uuid,
}

#[derive(Debug, Serialize)]
pub(super) struct DistanceData {
    pub a: Uuid,
    pub b: Uuid,
    pub distance_km: f64,
}

/// Point lookup against the distance-matrix artifact of the last run.
pub(super) async fn get_distance(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<DistanceQuery>,
) -> Result<Json<ApiResponse<DistanceData>>, ApiError> {
    let matrix = Arc::clone(&state.distance_matrix);
    let (a, b) = (query.a, query.b);
    let lookup = tokio::task::spawn_blocking(move || matrix.lookup(a, b)).await;

    match lookup {
        Ok(Ok(Some(distance_km))) => Ok(Json(ApiResponse::new(
            DistanceData { a, b, distance_km },
            req_id.0,
        ))),
        Ok(Ok(None)) => Err(ApiError::new(
            req_id.0,
            ErrorCode::NotFound,
            "outlet not present in the distance matrix",
        )),
        Ok(Err(e)) => {
            tracing::warn!(
                path = %state.distance_matrix.path().display(),
                error = %e,
                "distance lookup: matrix artifact unavailable"
            );
            Err(ApiError::new(
                req_id.0,
                ErrorCode::ArtifactUnavailable,
                "distance matrix is not available",
            ))
        }
        Err(e) => {
            tracing::error!(error = %e, "distance lookup task failed");
            Err(ApiError::new(
                req_id.0,
                ErrorCode::InternalError,
                "distance lookup failed",
            ))
        }
    }
}
