//! Read operations for the outlet dataset.
//!
//! Edges are stored as plain foreign-key pairs; "overlaps for outlet X" is a
//! join performed here at read time.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::types::{OperatingHoursRow, OutletRow, OverlapRow};
use crate::DbError;

const OUTLET_COLUMNS: &str =
    "id, name, address, latitude, longitude, operating_hours, waze_link";

const OVERLAP_SELECT: &str = "SELECT oo.id, \
            oo.outlet1_id, o1.name AS outlet1_name, \
            oo.outlet2_id, o2.name AS outlet2_name, \
            oo.distance \
     FROM overlapping_outlets oo \
     JOIN outlets o1 ON o1.id = oo.outlet1_id \
     JOIN outlets o2 ON o2.id = oo.outlet2_id";

const HOURS_COLUMNS: &str = "outlet_id, \
     mon_open, mon_close, tue_open, tue_close, wed_open, wed_close, \
     thu_open, thu_close, fri_open, fri_close, sat_open, sat_close, \
     sun_open, sun_close, public_holiday_open, public_holiday_close";

/// Everything the read side needs, taken from one consistent snapshot.
#[derive(Debug, Clone)]
pub struct DatasetSnapshot {
    pub outlets: Vec<OutletRow>,
    pub overlaps: Vec<OverlapRow>,
    pub operating_hours: Vec<OperatingHoursRow>,
    pub last_updated: Option<DateTime<Utc>>,
}

/// All outlets ordered by name.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn list_outlets(pool: &PgPool) -> Result<Vec<OutletRow>, sqlx::Error> {
    let mut conn = pool.acquire().await?;
    fetch_outlets(&mut conn).await
}

/// A single outlet by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no outlet has this id in the current
/// dataset, or [`DbError::Sqlx`] if the query fails.
pub async fn get_outlet(pool: &PgPool, id: Uuid) -> Result<OutletRow, DbError> {
    sqlx::query_as::<_, OutletRow>(&format!(
        "SELECT {OUTLET_COLUMNS} FROM outlets WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// All overlap edges with both endpoint names, closest first.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn list_overlaps(pool: &PgPool) -> Result<Vec<OverlapRow>, sqlx::Error> {
    let mut conn = pool.acquire().await?;
    fetch_overlaps(&mut conn).await
}

/// Overlap edges touching `outlet_id` on either side, closest first.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn list_overlaps_for_outlet(
    pool: &PgPool,
    outlet_id: Uuid,
) -> Result<Vec<OverlapRow>, sqlx::Error> {
    sqlx::query_as::<_, OverlapRow>(&format!(
        "{OVERLAP_SELECT} \
         WHERE oo.outlet1_id = $1 OR oo.outlet2_id = $1 \
         ORDER BY oo.distance, oo.id"
    ))
    .bind(outlet_id)
    .fetch_all(pool)
    .await
}

/// All normalized schedules.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn list_operating_hours(pool: &PgPool) -> Result<Vec<OperatingHoursRow>, sqlx::Error> {
    let mut conn = pool.acquire().await?;
    fetch_operating_hours(&mut conn).await
}

/// The normalized schedule for one outlet, if it has a row.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn get_operating_hours(
    pool: &PgPool,
    outlet_id: Uuid,
) -> Result<Option<OperatingHoursRow>, sqlx::Error> {
    sqlx::query_as::<_, OperatingHoursRow>(&format!(
        "SELECT {HOURS_COLUMNS} FROM outlet_operating_hours WHERE outlet_id = $1"
    ))
    .bind(outlet_id)
    .fetch_optional(pool)
    .await
}

/// Load outlets, overlaps, schedules, and the marker from one
/// `REPEATABLE READ, READ ONLY` transaction, so a concurrent replace is seen
/// either entirely or not at all.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any query fails.
pub async fn load_snapshot(pool: &PgPool) -> Result<DatasetSnapshot, DbError> {
    let mut tx = pool.begin().await?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
        .execute(&mut *tx)
        .await?;

    let outlets = fetch_outlets(&mut tx).await?;
    let overlaps = fetch_overlaps(&mut tx).await?;
    let operating_hours = fetch_operating_hours(&mut tx).await?;
    let last_updated = sqlx::query_scalar::<_, DateTime<Utc>>(
        "SELECT updated_at FROM latest_updated_timestamp WHERE id = 1",
    )
    .fetch_optional(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(DatasetSnapshot {
        outlets,
        overlaps,
        operating_hours,
        last_updated,
    })
}

async fn fetch_outlets(conn: &mut PgConnection) -> Result<Vec<OutletRow>, sqlx::Error> {
    sqlx::query_as::<_, OutletRow>(&format!(
        "SELECT {OUTLET_COLUMNS} FROM outlets ORDER BY name, id"
    ))
    .fetch_all(conn)
    .await
}

async fn fetch_overlaps(conn: &mut PgConnection) -> Result<Vec<OverlapRow>, sqlx::Error> {
    sqlx::query_as::<_, OverlapRow>(&format!("{OVERLAP_SELECT} ORDER BY oo.distance, oo.id"))
        .fetch_all(conn)
        .await
}

async fn fetch_operating_hours(
    conn: &mut PgConnection,
) -> Result<Vec<OperatingHoursRow>, sqlx::Error> {
    sqlx::query_as::<_, OperatingHoursRow>(&format!(
        "SELECT {HOURS_COLUMNS} FROM outlet_operating_hours ORDER BY outlet_id"
    ))
    .fetch_all(conn)
    .await
}
