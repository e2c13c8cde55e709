//! The single-row `latest_updated_timestamp` staleness marker.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use crate::DbError;

/// Returns the timestamp of the last successful ingestion, or `None` if no
/// ingestion has ever committed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_last_ingested_at(pool: &PgPool) -> Result<Option<DateTime<Utc>>, DbError> {
    let at = sqlx::query_scalar::<_, DateTime<Utc>>(
        "SELECT updated_at FROM latest_updated_timestamp WHERE id = 1",
    )
    .fetch_optional(pool)
    .await?;
    Ok(at)
}

/// Creates the marker row or overwrites its timestamp. Never appends.
pub(crate) async fn upsert_marker(
    conn: &mut PgConnection,
    at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO latest_updated_timestamp (id, updated_at) VALUES (1, $1) \
         ON CONFLICT (id) DO UPDATE SET updated_at = EXCLUDED.updated_at",
    )
    .bind(at)
    .execute(conn)
    .await?;
    Ok(())
}
