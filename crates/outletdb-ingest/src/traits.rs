//! Seams between the orchestrator and the outside world.
//!
//! Production wires the HTTP clients and [`crate::PgDatasetStore`]; tests
//! substitute in-memory fakes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use outletdb_db::{DbError, NewDataset, ReplaceCounts};
use outletdb_extract::{ExtractError, ExtractedHours, ExtractionClient, HoursInput};
use outletdb_source::{SourceBatch, SourceClient, SourceError};

/// Provider of raw outlet records.
#[async_trait]
pub trait OutletSource: Send + Sync {
    async fn fetch_outlets(&self) -> Result<SourceBatch, SourceError>;
}

/// Turns free-text hours into per-day fields, one batch at a time.
#[async_trait]
pub trait ScheduleExtractor: Send + Sync {
    async fn extract(&self, batch: &[HoursInput]) -> Result<Vec<ExtractedHours>, ExtractError>;
}

/// Where a finished run lands.
#[async_trait]
pub trait DatasetStore: Send + Sync {
    /// Replaces outlets, edges, and schedules and stamps the marker with
    /// `completed_at`, all or nothing.
    async fn replace_dataset(
        &self,
        dataset: NewDataset<'_>,
        completed_at: DateTime<Utc>,
    ) -> Result<ReplaceCounts, DbError>;

    async fn last_ingested_at(&self) -> Result<Option<DateTime<Utc>>, DbError>;
}

#[async_trait]
impl OutletSource for SourceClient {
    async fn fetch_outlets(&self) -> Result<SourceBatch, SourceError> {
        self.fetch().await
    }
}

#[async_trait]
impl ScheduleExtractor for ExtractionClient {
    async fn extract(&self, batch: &[HoursInput]) -> Result<Vec<ExtractedHours>, ExtractError> {
        self.extract_hours(batch).await
    }
}
