//! The ingestion pipeline: geodesic overlap detection, the distance-matrix
//! artifact, batched schedule normalization, the run orchestrator, and the
//! staleness gate that decides when a run is due.

pub mod error;
pub mod gate;
pub mod geo;
pub mod matrix;
pub mod orchestrator;
pub mod schedule;
pub mod store;
pub mod traits;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{ArtifactError, IngestError};
pub use gate::{is_stale, GateDecision, StalenessGate};
pub use geo::{compute_overlaps, DistanceMatrix, GeoResult};
pub use matrix::{lookup_distance, read_matrix, write_matrix, MatrixCache};
pub use orchestrator::{
    ArtifactStatus, IngestReport, IngestStage, Orchestrator, OrchestratorConfig, RunOutcome,
};
pub use schedule::{normalize_schedules, NormalizedSchedules, NormalizerConfig};
pub use store::PgDatasetStore;
pub use traits::{DatasetStore, OutletSource, ScheduleExtractor};
