//! One ingestion run, end to end: fetch, compute overlaps, normalize
//! schedules, replace the persisted dataset, write the matrix artifact.
//!
//! At most one run is in flight per [`Orchestrator`]; a trigger that arrives
//! while a run holds the guard returns [`RunOutcome::Skipped`], as does every
//! trigger after [`Orchestrator::close`].

use std::fmt;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use outletdb_core::{AppConfig, Outlet};
use outletdb_db::NewDataset;
use tokio::sync::{watch, Mutex};
use uuid::Uuid;

use crate::error::IngestError;
use crate::geo::{compute_overlaps_blocking_pool, DistanceMatrix, DEFAULT_OVERLAP_THRESHOLD_KM};
use crate::matrix::write_matrix;
use crate::schedule::{normalize_schedules, NormalizerConfig};
use crate::traits::{DatasetStore, OutletSource, ScheduleExtractor};

const DEFAULT_PERSIST_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_MATRIX_PATH: &str = "./data/distance_matrix.csv";

/// Where the orchestrator is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStage {
    Idle,
    Fetching,
    Computing,
    Normalizing,
    Persisting,
    /// Briefly visible between an aborted run and the return to `Idle`.
    Failed,
}

impl IngestStage {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Fetching => "fetching",
            Self::Computing => "computing",
            Self::Normalizing => "normalizing",
            Self::Persisting => "persisting",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for IngestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactStatus {
    Written(PathBuf),
    Failed(String),
}

/// Summary of a committed run.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub started_at: DateTime<Utc>,
    /// The value written to the staleness marker.
    pub completed_at: DateTime<Utc>,
    pub outlets: usize,
    /// Feed entries dropped by the source before the run saw them.
    pub skipped_records: usize,
    pub overlaps: usize,
    /// Outlets left out of the matrix and every pair for lack of a latitude.
    pub excluded: Vec<Uuid>,
    pub batches: usize,
    pub failed_batches: usize,
    /// Outlets persisted with an all-null schedule because no record came back.
    pub missing_schedules: Vec<Uuid>,
    pub unparsed_fields: usize,
    pub rejected_pairs: usize,
    /// Rows removed from the previous dataset.
    pub replaced_rows: u64,
    pub artifact: ArtifactStatus,
}

#[derive(Debug, Clone)]
pub enum RunOutcome {
    Completed(IngestReport),
    /// Another run held the guard; nothing was done.
    Skipped,
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub overlap_threshold_km: f64,
    pub normalizer: NormalizerConfig,
    pub persist_timeout: Duration,
    pub distance_matrix_path: PathBuf,
    /// Blocking workers for the distance matrix on large inputs.
    pub geo_workers: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            overlap_threshold_km: DEFAULT_OVERLAP_THRESHOLD_KM,
            normalizer: NormalizerConfig::default(),
            persist_timeout: DEFAULT_PERSIST_TIMEOUT,
            distance_matrix_path: PathBuf::from(DEFAULT_MATRIX_PATH),
            geo_workers: default_geo_workers(),
        }
    }
}

impl OrchestratorConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            overlap_threshold_km: config.overlap_threshold_km,
            normalizer: NormalizerConfig::from_app_config(config),
            persist_timeout: Duration::from_secs(config.persist_timeout_secs),
            distance_matrix_path: config.distance_matrix_path.clone(),
            geo_workers: default_geo_workers(),
        }
    }

    /// Short timeouts and a throwaway artifact path.
    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        Self {
            normalizer: NormalizerConfig {
                batch_timeout: Duration::from_secs(5),
                stage_timeout: Duration::from_secs(10),
                ..NormalizerConfig::default()
            },
            persist_timeout: Duration::from_secs(5),
            distance_matrix_path: std::env::temp_dir()
                .join(format!("outletdb-orchestrator-{}", Uuid::new_v4()))
                .join("distance_matrix.csv"),
            ..Self::default()
        }
    }
}

fn default_geo_workers() -> usize {
    std::thread::available_parallelism().map_or(4, NonZeroUsize::get)
}

pub struct Orchestrator {
    source: Arc<dyn OutletSource>,
    extractor: Arc<dyn ScheduleExtractor>,
    store: Arc<dyn DatasetStore>,
    config: OrchestratorConfig,
    run_guard: Mutex<()>,
    closed: AtomicBool,
    stage: watch::Sender<IngestStage>,
}

impl Orchestrator {
    #[must_use]
    pub fn new(
        source: Arc<dyn OutletSource>,
        extractor: Arc<dyn ScheduleExtractor>,
        store: Arc<dyn DatasetStore>,
        config: OrchestratorConfig,
    ) -> Self {
        let (stage, _) = watch::channel(IngestStage::Idle);
        Self {
            source,
            extractor,
            store,
            config,
            run_guard: Mutex::new(()),
            closed: AtomicBool::new(false),
            stage,
        }
    }

    #[must_use]
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    #[must_use]
    pub fn stage(&self) -> IngestStage {
        *self.stage.borrow()
    }

    /// Receives every stage transition from now on.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<IngestStage> {
        self.stage.subscribe()
    }

    /// Refuses every later trigger. A run already holding the guard finishes;
    /// pair with [`Self::wait_idle`] to drain it.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Waits until no run is in flight.
    pub async fn wait_idle(&self) {
        let _guard = self.run_guard.lock().await;
    }

    /// Runs one ingestion unless another is already in flight.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError`] when the source fetch, the distance computation,
    /// or persistence fails. The persisted dataset and the staleness marker are
    /// unchanged in every error case.
    pub async fn run(&self) -> Result<RunOutcome, IngestError> {
        let Ok(_guard) = self.run_guard.try_lock() else {
            tracing::info!(stage = %self.stage(), "ingest: run already in progress; skipping trigger");
            return Ok(RunOutcome::Skipped);
        };
        // Checked under the guard: once `close` has returned, any run that
        // gets here afterwards is refused, so `wait_idle` cannot be overtaken.
        if self.is_closed() {
            tracing::info!("ingest: orchestrator closed; skipping trigger");
            return Ok(RunOutcome::Skipped);
        }

        let result = self.run_locked().await;
        match &result {
            Ok(report) => {
                tracing::info!(
                    outlets = report.outlets,
                    overlaps = report.overlaps,
                    missing_schedules = report.missing_schedules.len(),
                    completed_at = %report.completed_at,
                    "ingest: run complete"
                );
            }
            Err(e) => {
                self.set_stage(IngestStage::Failed);
                tracing::error!(error = %e, "ingest: run failed; previous dataset left in place");
            }
        }
        self.set_stage(IngestStage::Idle);
        result.map(RunOutcome::Completed)
    }

    async fn run_locked(&self) -> Result<IngestReport, IngestError> {
        let started_at = Utc::now();

        self.set_stage(IngestStage::Fetching);
        let batch = self.source.fetch_outlets().await?;
        if !batch.skipped.is_empty() {
            tracing::warn!(
                skipped = batch.skipped.len(),
                "ingest: source records skipped during validation"
            );
        }
        let skipped_records = batch.skipped.len();
        let outlets: Vec<Outlet> = batch
            .records
            .into_iter()
            .map(|record| record.into_outlet(Uuid::new_v4()))
            .collect();
        if outlets.is_empty() {
            tracing::warn!("ingest: source returned zero outlets; persisting an empty dataset");
        } else {
            tracing::info!(outlets = outlets.len(), "ingest: fetched outlets");
        }

        self.set_stage(IngestStage::Computing);
        let geo = compute_overlaps_blocking_pool(
            &outlets,
            self.config.overlap_threshold_km,
            self.config.geo_workers,
        )
        .await?;
        if !geo.excluded.is_empty() {
            tracing::warn!(
                excluded = geo.excluded.len(),
                ids = ?geo.excluded,
                "ingest: outlets without latitude excluded from distance computation"
            );
        }
        tracing::info!(
            overlaps = geo.edges.len(),
            threshold_km = self.config.overlap_threshold_km,
            "ingest: overlaps computed"
        );

        self.set_stage(IngestStage::Normalizing);
        let normalized =
            normalize_schedules(self.extractor.as_ref(), &outlets, &self.config.normalizer).await;
        if normalized.failed_batches > 0 || !normalized.missing.is_empty() {
            tracing::warn!(
                failed_batches = normalized.failed_batches,
                batches = normalized.batches,
                missing = normalized.missing.len(),
                "ingest: schedule normalization degraded; missing outlets get null schedules"
            );
        }
        if normalized.unparsed_fields > 0 || normalized.rejected_pairs > 0 {
            tracing::warn!(
                unparsed_fields = normalized.unparsed_fields,
                rejected_pairs = normalized.rejected_pairs,
                "ingest: schedule fields nulled during parsing"
            );
        }

        self.set_stage(IngestStage::Persisting);
        let completed_at = Utc::now();
        let dataset = NewDataset {
            outlets: &outlets,
            edges: &geo.edges,
            schedules: &normalized.schedules,
        };
        // Dropping the in-flight replace on timeout drops its transaction,
        // which rolls back.
        let persisted = tokio::time::timeout(
            self.config.persist_timeout,
            self.store.replace_dataset(dataset, completed_at),
        )
        .await;
        let counts = match persisted {
            Ok(counts) => counts?,
            Err(_) => {
                return Err(IngestError::PersistTimeout {
                    secs: self.config.persist_timeout.as_secs(),
                })
            }
        };
        tracing::info!(
            outlets = counts.outlets,
            edges = counts.edges,
            schedules = counts.schedules,
            deleted = counts.deleted,
            "ingest: dataset replaced"
        );

        let artifact = self.write_artifact(geo.matrix).await;

        Ok(IngestReport {
            started_at,
            completed_at,
            outlets: outlets.len(),
            skipped_records,
            overlaps: geo.edges.len(),
            excluded: geo.excluded,
            batches: normalized.batches,
            failed_batches: normalized.failed_batches,
            missing_schedules: normalized.missing,
            unparsed_fields: normalized.unparsed_fields,
            rejected_pairs: normalized.rejected_pairs,
            replaced_rows: counts.deleted,
            artifact,
        })
    }

    /// Writes the matrix off the async runtime. Failure is logged and
    /// reported, never raised: the dataset is already committed.
    async fn write_artifact(&self, matrix: DistanceMatrix) -> ArtifactStatus {
        let path = self.config.distance_matrix_path.clone();
        let target = path.clone();
        let written = tokio::task::spawn_blocking(move || write_matrix(&target, &matrix)).await;

        match written {
            Ok(Ok(())) => {
                tracing::info!(path = %path.display(), "ingest: distance matrix written");
                ArtifactStatus::Written(path)
            }
            Ok(Err(e)) => {
                tracing::error!(
                    path = %path.display(),
                    error = %e,
                    "ingest: distance matrix write failed"
                );
                ArtifactStatus::Failed(e.to_string())
            }
            Err(e) => {
                tracing::error!(error = %e, "ingest: distance matrix writer task failed");
                ArtifactStatus::Failed(e.to_string())
            }
        }
    }

    fn set_stage(&self, stage: IngestStage) {
        let previous = self.stage.send_replace(stage);
        if previous != stage {
            tracing::info!(from = %previous, to = %stage, "ingest: stage transition");
        }
    }
}

#[cfg(test)]
#[path = "orchestrator_test.rs"]
mod tests;
