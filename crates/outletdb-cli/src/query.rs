use std::path::Path;

use chrono::{DateTime, Utc};
use outletdb_ingest::is_stale;
use uuid::Uuid;

/// Show the staleness marker and whether the next gate check would run.
///
/// # Errors
///
/// Returns an error if the marker cannot be read.
pub(crate) async fn run_status(
    pool: &sqlx::PgPool,
    config: &outletdb_core::AppConfig,
) -> anyhow::Result<()> {
    let marker = outletdb_db::get_last_ingested_at(pool).await?;
    let outlets = outletdb_db::list_outlets(pool).await?.len();
    let now = Utc::now();

    println!("last ingested: {}", fmt_marker(marker, now));
    println!("outlets:       {outlets}");
    println!(
        "stale:         {} (window {}s)",
        is_stale(marker, now, config.freshness_window()),
        config.freshness_window_secs
    );
    Ok(())
}

/// Print the distance between two outlets from the matrix artifact.
///
/// # Errors
///
/// Returns an error if the artifact cannot be read or either id is absent.
pub(crate) fn run_distance(path: &Path, a: Uuid, b: Uuid) -> anyhow::Result<()> {
    let km = outletdb_ingest::lookup_distance(path, a, b)?
        .ok_or_else(|| anyhow::anyhow!("outlet not present in {}", path.display()))?;
    println!("{km:.3} km");
    Ok(())
}

/// List overlap edges, closest first, optionally only those touching `outlet`.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub(crate) async fn run_overlaps(pool: &sqlx::PgPool, outlet: Option<Uuid>) -> anyhow::Result<()> {
    let rows = match outlet {
        Some(id) => outletdb_db::list_overlaps_for_outlet(pool, id).await?,
        None => outletdb_db::list_overlaps(pool).await?,
    };

    if rows.is_empty() {
        println!("no overlapping outlets; run `ingest` first if the dataset is empty");
        return Ok(());
    }

    println!("{:<10}{:<32}OUTLET", "KM", "OUTLET");
    for row in &rows {
        println!(
            "{:<10.3}{:<32}{}",
            row.distance,
            truncate(&row.outlet1_name, 30),
            truncate(&row.outlet2_name, 30)
        );
    }
    Ok(())
}

pub(crate) fn fmt_marker(marker: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    match marker {
        None => "never".to_string(),
        Some(at) => {
            let age = now - at;
            format!(
                "{} ({}h {}m ago)",
                at.format("%Y-%m-%d %H:%M:%S UTC"),
                age.num_hours(),
                age.num_minutes() % 60
            )
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        format!("{}...", s.chars().take(max - 3).collect::<String>())
    } else {
        s.to_string()
    }
}
