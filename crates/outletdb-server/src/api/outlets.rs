use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{DateTime, NaiveTime, Utc};
use outletdb_core::{ScheduleDay, WeeklySchedule};
use outletdb_db::{OperatingHoursRow, OutletRow, OverlapRow};
use serde::Serialize;
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub(super) struct OutletItem {
    pub id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: f64,
    pub operating_hours: Option<String>,
    pub waze_link: String,
    /// Empty when the outlet has no schedule row.
    pub schedule: Vec<DaySlot>,
    pub overlaps: Vec<OverlapNeighbor>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub(super) struct DaySlot {
    pub day: ScheduleDay,
    pub open: Option<NaiveTime>,
    pub close: Option<NaiveTime>,
}

#[derive(Debug, Serialize)]
pub(super) struct OverlapNeighbor {
    pub outlet_id: Uuid,
    pub name: String,
    pub distance_km: f64,
}

#[derive(Debug, Serialize)]
pub(super) struct OutletList {
    pub outlets: Vec<OutletItem>,
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub(super) struct OverlapItem {
    pub outlet1_id: Uuid,
    pub outlet1_name: String,
    pub outlet2_id: Uuid,
    pub outlet2_name: String,
    pub distance_km: f64,
}

fn day_slots(schedule: &WeeklySchedule) -> Vec<DaySlot> {
    schedule
        .iter()
        .map(|(day, hours)| DaySlot {
            day,
            open: hours.open,
            close: hours.close,
        })
        .collect()
}

/// The edge as seen from `outlet_id`, or `None` if it does not touch it.
fn neighbor(row: &OverlapRow, outlet_id: Uuid) -> Option<OverlapNeighbor> {
    let (id, name) = if row.outlet1_id == outlet_id {
        (row.outlet2_id, &row.outlet2_name)
    } else if row.outlet2_id == outlet_id {
        (row.outlet1_id, &row.outlet1_name)
    } else {
        return None;
    };
    Some(OverlapNeighbor {
        outlet_id: id,
        name: name.clone(),
        distance_km: row.distance,
    })
}

fn outlet_item(
    row: OutletRow,
    schedule: Option<WeeklySchedule>,
    overlaps: Vec<OverlapNeighbor>,
) -> OutletItem {
    OutletItem {
        id: row.id,
        name: row.name,
        address: row.address,
        latitude: row.latitude,
        longitude: row.longitude,
        operating_hours: row.operating_hours,
        waze_link: row.waze_link,
        schedule: schedule.as_ref().map(day_slots).unwrap_or_default(),
        overlaps,
    }
}

/// Joins outlets with their schedules and edges, in outlet order.
pub(super) fn join_dataset(
    outlets: Vec<OutletRow>,
    overlaps: &[OverlapRow],
    operating_hours: Vec<OperatingHoursRow>,
) -> Vec<OutletItem> {
    let mut schedules: HashMap<Uuid, WeeklySchedule> = operating_hours
        .into_iter()
        .map(|row| (row.outlet_id, WeeklySchedule::from(row)))
        .collect();
    let mut neighbors: HashMap<Uuid, Vec<OverlapNeighbor>> = HashMap::new();
    for row in overlaps {
        for id in [row.outlet1_id, row.outlet2_id] {
            if let Some(n) = neighbor(row, id) {
                neighbors.entry(id).or_default().push(n);
            }
        }
    }

    outlets
        .into_iter()
        .map(|row| {
            let schedule = schedules.remove(&row.id);
            let overlaps = neighbors.remove(&row.id).unwrap_or_default();
            outlet_item(row, schedule, overlaps)
        })
        .collect()
}

pub(super) async fn list_outlets(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<OutletList>>, ApiError> {
    let snapshot = outletdb_db::load_snapshot(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let outlets = join_dataset(
        snapshot.outlets,
        &snapshot.overlaps,
        snapshot.operating_hours,
    );

    Ok(Json(ApiResponse::new(
        OutletList {
            outlets,
            last_updated: snapshot.last_updated,
        },
        req_id.0,
    )))
}

pub(super) async fn get_outlet(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<OutletItem>>, ApiError> {
    let row = outletdb_db::get_outlet(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    let edges = outletdb_db::list_overlaps_for_outlet(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &outletdb_db::DbError::from(e)))?;
    let schedule = outletdb_db::get_operating_hours(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &outletdb_db::DbError::from(e)))?
        .map(WeeklySchedule::from);

    let overlaps = edges.iter().filter_map(|row| neighbor(row, id)).collect();
    Ok(Json(ApiResponse::new(
        outlet_item(row, schedule, overlaps),
        req_id.0,
    )))
}

pub(super) async fn list_overlaps(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<OverlapItem>>>, ApiError> {
    let rows = outletdb_db::list_overlaps(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &outletdb_db::DbError::from(e)))?;

    let data = rows
        .into_iter()
        .map(|row| OverlapItem {
            outlet1_id: row.outlet1_id,
            outlet1_name: row.outlet1_name,
            outlet2_id: row.outlet2_id,
            outlet2_name: row.outlet2_name,
            distance_km: row.distance,
        })
        .collect();

    Ok(Json(ApiResponse::new(data, req_id.0)))
}
