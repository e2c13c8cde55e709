//! In-memory fakes for the pipeline seams.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use outletdb_core::{Outlet, OutletRecord, OverlapEdge, WeeklySchedule};
use outletdb_db::{DbError, NewDataset, ReplaceCounts};
use outletdb_extract::{ExtractError, ExtractedHours, HoursInput};
use outletdb_source::{SkippedRecord, SourceBatch, SourceError};

use crate::traits::{DatasetStore, OutletSource, ScheduleExtractor};

pub(crate) fn record(name: &str, latitude: f64, longitude: f64) -> OutletRecord {
    OutletRecord {
        name: name.to_string(),
        address: Some(format!("{name}, Kuala Lumpur")),
        latitude: Some(latitude),
        longitude,
        operating_hours: Some("Monday 08:00 - 22:00".to_string()),
        waze_link: format!("https://waze.com/ul?q={name}"),
    }
}

pub(crate) struct FakeSource {
    records: Vec<OutletRecord>,
    skipped: Vec<SkippedRecord>,
    pub(crate) fail: AtomicBool,
    pub(crate) delay: Duration,
    pub(crate) calls: AtomicUsize,
}

impl FakeSource {
    pub(crate) fn new(records: Vec<OutletRecord>) -> Self {
        Self {
            records,
            skipped: Vec::new(),
            fail: AtomicBool::new(false),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_skipped(mut self, skipped: Vec<SkippedRecord>) -> Self {
        self.skipped = skipped;
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl OutletSource for FakeSource {
    async fn fetch_outlets(&self) -> Result<SourceBatch, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(SourceError::UnexpectedStatus {
                status: 502,
                url: "http://source.test/outlets".to_string(),
            });
        }
        Ok(SourceBatch {
            records: self.records.clone(),
            skipped: self.skipped.clone(),
        })
    }
}

/// Answers every outlet with Monday 08:00-22:00.
pub(crate) struct EchoExtractor;

#[async_trait]
impl ScheduleExtractor for EchoExtractor {
    async fn extract(&self, batch: &[HoursInput]) -> Result<Vec<ExtractedHours>, ExtractError> {
        Ok(batch
            .iter()
            .map(|h| ExtractedHours {
                outlet_id: h.outlet_id,
                mon_open: Some("08:00".into()),
                mon_close: Some("22:00".into()),
                ..ExtractedHours::default()
            })
            .collect())
    }
}

/// Always fails.
pub(crate) struct DownExtractor;

#[async_trait]
impl ScheduleExtractor for DownExtractor {
    async fn extract(&self, _batch: &[HoursInput]) -> Result<Vec<ExtractedHours>, ExtractError> {
        Err(ExtractError::Status {
            status: 503,
            body: "unavailable".into(),
        })
    }
}

/// What the last successful replace wrote.
#[derive(Debug, Clone)]
pub(crate) struct StoredDataset {
    pub(crate) outlets: Vec<Outlet>,
    pub(crate) edges: Vec<OverlapEdge>,
    pub(crate) schedules: Vec<WeeklySchedule>,
}

/// Mirrors the all-or-nothing contract: a failed or cancelled replace leaves
/// both the dataset and the marker untouched.
#[derive(Default)]
pub(crate) struct FakeStore {
    marker: Mutex<Option<DateTime<Utc>>>,
    dataset: Mutex<Option<StoredDataset>>,
    pub(crate) fail_replace: AtomicBool,
    pub(crate) marker_read_fails: AtomicBool,
    pub(crate) replace_delay: Mutex<Duration>,
    pub(crate) replace_calls: AtomicUsize,
}

impl FakeStore {
    pub(crate) fn set_marker(&self, marker: Option<DateTime<Utc>>) {
        *self.marker.lock().unwrap() = marker;
    }

    pub(crate) fn marker(&self) -> Option<DateTime<Utc>> {
        *self.marker.lock().unwrap()
    }

    pub(crate) fn dataset(&self) -> Option<StoredDataset> {
        self.dataset.lock().unwrap().clone()
    }
}

#[async_trait]
impl DatasetStore for FakeStore {
    async fn replace_dataset(
        &self,
        dataset: NewDataset<'_>,
        completed_at: DateTime<Utc>,
    ) -> Result<ReplaceCounts, DbError> {
        self.replace_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.replace_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.fail_replace.load(Ordering::SeqCst) {
            return Err(DbError::Sqlx(sqlx::Error::PoolTimedOut));
        }

        let previous = self.dataset.lock().unwrap().replace(StoredDataset {
            outlets: dataset.outlets.to_vec(),
            edges: dataset.edges.to_vec(),
            schedules: dataset.schedules.to_vec(),
        });
        self.set_marker(Some(completed_at));

        let deleted = previous.map_or(0, |p| p.outlets.len() + p.edges.len() + p.schedules.len());
        Ok(ReplaceCounts {
            outlets: dataset.outlets.len() as u64,
            edges: dataset.edges.len() as u64,
            schedules: dataset.schedules.len() as u64,
            deleted: deleted as u64,
        })
    }

    async fn last_ingested_at(&self) -> Result<Option<DateTime<Utc>>, DbError> {
        if self.marker_read_fails.load(Ordering::SeqCst) {
            return Err(DbError::Sqlx(sqlx::Error::PoolTimedOut));
        }
        Ok(self.marker())
    }
}
