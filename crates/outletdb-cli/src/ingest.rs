use std::sync::Arc;

use anyhow::Context;
use outletdb_extract::{ExtractionClient, RetryPolicy};
use outletdb_ingest::{
    ArtifactStatus, DatasetStore, IngestReport, Orchestrator, OrchestratorConfig, PgDatasetStore,
    RunOutcome, StalenessGate,
};
use outletdb_source::SourceClient;

/// Run one ingestion, through the staleness gate unless `force` is set.
///
/// # Errors
///
/// Returns an error if a client cannot be built or the run aborts (source
/// fetch, distance computation, or persistence failure). Degraded schedule
/// normalization and a failed artifact write are reported, not returned.
pub(crate) async fn run_ingest(
    pool: sqlx::PgPool,
    config: &outletdb_core::AppConfig,
    force: bool,
) -> anyhow::Result<()> {
    let source = SourceClient::new(&config.source_url, config.source_timeout_secs)
        .context("failed to build source client")?;
    let retry = RetryPolicy {
        max_retries: config.extract_max_retries,
        backoff_base_ms: config.extract_retry_backoff_ms,
    };
    let extractor = ExtractionClient::new(
        &config.extract_endpoint,
        config.extract_api_key.as_deref(),
        retry.attempt_timeout_secs(config.extract_timeout_secs),
        retry,
    )
    .context("failed to build extraction client")?;
    let store: Arc<dyn DatasetStore> = Arc::new(PgDatasetStore::new(pool));
    let orchestrator = Orchestrator::new(
        Arc::new(source),
        Arc::new(extractor),
        Arc::clone(&store),
        OrchestratorConfig::from_app_config(config),
    );

    tracing::info!(force, "cli: starting ingestion");
    let outcome = if force {
        Some(orchestrator.run().await?)
    } else {
        StalenessGate::new(store, config.freshness_window())
            .run_if_stale(&orchestrator)
            .await?
    };

    match outcome {
        None => println!("data is fresh; nothing to do (use --force to run anyway)"),
        Some(RunOutcome::Skipped) => println!("another ingestion is already running"),
        Some(RunOutcome::Completed(report)) => {
            for line in report_lines(&report) {
                println!("{line}");
            }
        }
    }
    Ok(())
}

pub(crate) fn report_lines(report: &IngestReport) -> Vec<String> {
    let elapsed = report.completed_at - report.started_at;
    let mut lines = vec![
        format!(
            "ingested {} outlets, {} overlaps in {}ms",
            report.outlets,
            report.overlaps,
            elapsed.num_milliseconds()
        ),
        format!(
            "schedules: {} batches, {} failed, {} outlets without hours",
            report.batches,
            report.failed_batches,
            report.missing_schedules.len()
        ),
    ];
    if report.unparsed_fields > 0 || report.rejected_pairs > 0 {
        lines.push(format!(
            "nulled {} unparseable fields and {} inverted open/close pairs",
            report.unparsed_fields, report.rejected_pairs
        ));
    }
    if report.skipped_records > 0 {
        lines.push(format!(
            "skipped {} invalid source records",
            report.skipped_records
        ));
    }
    if !report.excluded.is_empty() {
        lines.push(format!(
            "{} outlets without latitude left out of the distance matrix",
            report.excluded.len()
        ));
    }
    lines.push(match &report.artifact {
        ArtifactStatus::Written(path) => format!("distance matrix: {}", path.display()),
        ArtifactStatus::Failed(reason) => format!("distance matrix NOT written: {reason}"),
    });
    lines
}
