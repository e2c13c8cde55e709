//! Write operations for the outlet dataset.

use chrono::{DateTime, NaiveTime, Utc};
use outletdb_core::{Outlet, OverlapEdge, WeeklySchedule};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::types::{hours_columns, NewDataset, ReplaceCounts};
use crate::marker::upsert_marker;
use crate::DbError;

/// Replace the whole dataset and stamp the staleness marker, atomically.
///
/// Deletes every existing overlap edge, schedule, and outlet, inserts the new
/// sets, and upserts the marker to `completed_at` inside one transaction. If
/// any statement or the commit fails the transaction is rolled back (on drop)
/// and both the previous dataset and the previous marker stay visible.
///
/// Rows are removed with `DELETE` rather than `TRUNCATE` so concurrent
/// readers keep seeing the old snapshot under MVCC until commit.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement or the commit fails, including
/// constraint violations such as an edge referencing an unknown outlet.
pub async fn replace_dataset(
    pool: &PgPool,
    dataset: NewDataset<'_>,
    completed_at: DateTime<Utc>,
) -> Result<ReplaceCounts, DbError> {
    let mut tx = pool.begin().await?;

    let deleted = delete_all(&mut *tx).await?;
    let outlets = insert_outlets(&mut *tx, dataset.outlets).await?;
    let edges = insert_edges(&mut *tx, dataset.edges).await?;
    let schedules = insert_schedules(&mut *tx, dataset.schedules).await?;
    upsert_marker(&mut *tx, completed_at).await?;

    tx.commit().await?;

    Ok(ReplaceCounts {
        outlets,
        edges,
        schedules,
        deleted,
    })
}

async fn delete_all(conn: &mut PgConnection) -> Result<u64, sqlx::Error> {
    let mut deleted = 0u64;
    // Children first: both child tables reference outlets(id).
    for table in ["overlapping_outlets", "outlet_operating_hours", "outlets"] {
        deleted += sqlx::query(&format!("DELETE FROM {table}"))
            .execute(&mut *conn)
            .await?
            .rows_affected();
    }
    Ok(deleted)
}

/// Bulk insert via a single `INSERT … SELECT * FROM UNNEST(…)` round-trip.
async fn insert_outlets(conn: &mut PgConnection, outlets: &[Outlet]) -> Result<u64, sqlx::Error> {
    if outlets.is_empty() {
        return Ok(0);
    }

    let mut ids: Vec<Uuid> = Vec::with_capacity(outlets.len());
    let mut names: Vec<String> = Vec::with_capacity(outlets.len());
    let mut addresses: Vec<Option<String>> = Vec::with_capacity(outlets.len());
    let mut latitudes: Vec<Option<f64>> = Vec::with_capacity(outlets.len());
    let mut longitudes: Vec<f64> = Vec::with_capacity(outlets.len());
    let mut operating_hours: Vec<Option<String>> = Vec::with_capacity(outlets.len());
    let mut waze_links: Vec<String> = Vec::with_capacity(outlets.len());

    for outlet in outlets {
        ids.push(outlet.id);
        names.push(outlet.name.clone());
        addresses.push(outlet.address.clone());
        latitudes.push(outlet.latitude);
        longitudes.push(outlet.longitude);
        operating_hours.push(outlet.operating_hours.clone());
        waze_links.push(outlet.waze_link.clone());
    }

    let result = sqlx::query(
        "INSERT INTO outlets \
             (id, name, address, latitude, longitude, operating_hours, waze_link) \
         SELECT * FROM UNNEST(\
              $1::uuid[], $2::text[], $3::text[], $4::float8[], $5::float8[], \
              $6::text[], $7::text[])",
    )
    .bind(&ids)
    .bind(&names)
    .bind(&addresses)
    .bind(&latitudes)
    .bind(&longitudes)
    .bind(&operating_hours)
    .bind(&waze_links)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

async fn insert_edges(conn: &mut PgConnection, edges: &[OverlapEdge]) -> Result<u64, sqlx::Error> {
    if edges.is_empty() {
        return Ok(0);
    }

    let outlet1_ids: Vec<Uuid> = edges.iter().map(|e| e.outlet1_id).collect();
    let outlet2_ids: Vec<Uuid> = edges.iter().map(|e| e.outlet2_id).collect();
    let distances: Vec<f64> = edges.iter().map(|e| e.distance_km).collect();

    let result = sqlx::query(
        "INSERT INTO overlapping_outlets (outlet1_id, outlet2_id, distance) \
         SELECT * FROM UNNEST($1::uuid[], $2::uuid[], $3::float8[])",
    )
    .bind(&outlet1_ids)
    .bind(&outlet2_ids)
    .bind(&distances)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

async fn insert_schedules(
    conn: &mut PgConnection,
    schedules: &[WeeklySchedule],
) -> Result<u64, sqlx::Error> {
    if schedules.is_empty() {
        return Ok(0);
    }

    let columns = hours_columns();
    let casts: Vec<String> = (0..columns.len())
        .map(|i| format!("${}::time[]", i + 2))
        .collect();
    let sql = format!(
        "INSERT INTO outlet_operating_hours (outlet_id, {}) \
         SELECT * FROM UNNEST($1::uuid[], {})",
        columns.join(", "),
        casts.join(", ")
    );

    let outlet_ids: Vec<Uuid> = schedules.iter().map(|s| s.outlet_id).collect();
    let mut values: Vec<Vec<Option<NaiveTime>>> =
        vec![Vec::with_capacity(schedules.len()); columns.len()];
    for schedule in schedules {
        for (slot, (_, hours)) in schedule.iter().enumerate() {
            values[slot * 2].push(hours.open);
            values[slot * 2 + 1].push(hours.close);
        }
    }

    let mut query = sqlx::query(&sql).bind(&outlet_ids);
    for column in &values {
        query = query.bind(column);
    }

    Ok(query.execute(&mut *conn).await?.rows_affected())
}
