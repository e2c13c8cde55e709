use std::collections::{HashMap, HashSet};
use std::time::Duration;

use futures::stream::{self, StreamExt};
use outletdb_core::{AppConfig, Outlet, WeeklySchedule};
use outletdb_extract::{ExtractError, ExtractedHours, HoursInput};
use uuid::Uuid;

use super::parse::parse_record;
use crate::traits::ScheduleExtractor;

const DEFAULT_BATCH_SIZE: usize = 50;
const DEFAULT_MAX_CONCURRENT_BATCHES: usize = 4;
const DEFAULT_BATCH_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_STAGE_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizerConfig {
    pub batch_size: usize,
    pub max_concurrent_batches: usize,
    /// Bounds one batch including the extractor's own retries.
    pub batch_timeout: Duration,
    /// Bounds the whole stage; unfinished batches count as failed.
    pub stage_timeout: Duration,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_concurrent_batches: DEFAULT_MAX_CONCURRENT_BATCHES,
            batch_timeout: DEFAULT_BATCH_TIMEOUT,
            stage_timeout: DEFAULT_STAGE_TIMEOUT,
        }
    }
}

impl NormalizerConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            max_concurrent_batches: config.max_concurrent_batches,
            batch_timeout: Duration::from_secs(config.extract_timeout_secs),
            stage_timeout: Duration::from_secs(config.normalize_stage_timeout_secs),
        }
    }
}

/// Stage output: one schedule per input outlet, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedSchedules {
    pub schedules: Vec<WeeklySchedule>,
    /// Outlets that got no record at all (failed batch or omitted by the
    /// service). Their schedules are all-null. An outlet whose record parsed
    /// to all-null is not listed here.
    pub missing: Vec<Uuid>,
    pub batches: usize,
    pub failed_batches: usize,
    pub unparsed_fields: usize,
    pub rejected_pairs: usize,
}

enum BatchOutcome {
    Done(Vec<ExtractedHours>),
    Failed(ExtractError),
    TimedOut,
}

/// Splits `outlets` into `⌈len / batch_size⌉` batches, runs up to
/// `max_concurrent_batches` of them at once, and reassembles the results by
/// outlet id.
///
/// Never fails: a failed or timed-out batch leaves its outlets in
/// [`NormalizedSchedules::missing`], and the stage timeout stops waiting for
/// whatever is still in flight.
pub async fn normalize_schedules(
    extractor: &dyn ScheduleExtractor,
    outlets: &[Outlet],
    config: &NormalizerConfig,
) -> NormalizedSchedules {
    let batch_size = config.batch_size.max(1);
    let max_concurrent = config.max_concurrent_batches.max(1);
    let batch_timeout = config.batch_timeout;

    let batches: Vec<Vec<HoursInput>> = outlets
        .chunks(batch_size)
        .map(|chunk| {
            chunk
                .iter()
                .map(|o| HoursInput {
                    outlet_id: o.id,
                    operating_hours: o.operating_hours.clone(),
                })
                .collect()
        })
        .collect();
    let total = batches.len();

    let mut finished: Vec<(usize, HashSet<Uuid>, BatchOutcome)> = Vec::with_capacity(total);
    let stream = stream::iter(batches.into_iter().enumerate())
        .map(|(index, batch)| async move {
            let ids: HashSet<Uuid> = batch.iter().map(|h| h.outlet_id).collect();
            let call = tokio::time::timeout(batch_timeout, extractor.extract(&batch));
            let outcome = match call.await {
                Ok(Ok(records)) => BatchOutcome::Done(records),
                Ok(Err(e)) => BatchOutcome::Failed(e),
                Err(_) => BatchOutcome::TimedOut,
            };
            (index, ids, outcome)
        })
        .buffer_unordered(max_concurrent);
    let mut stream = std::pin::pin!(stream);

    let drain = async {
        while let Some(item) = stream.next().await {
            finished.push(item);
        }
    };
    if tokio::time::timeout(config.stage_timeout, drain).await.is_err() {
        tracing::warn!(
            finished = finished.len(),
            total,
            timeout_secs = config.stage_timeout.as_secs(),
            "normalize: stage timed out, abandoning unfinished batches"
        );
    }

    let (mut result, succeeded) = reassemble(outlets, finished);
    result.batches = total;
    // Batches still in flight when the stage timed out count as failed too.
    result.failed_batches = total - succeeded;
    result
}

/// Returns the stage output and how many batches succeeded.
fn reassemble(
    outlets: &[Outlet],
    finished: Vec<(usize, HashSet<Uuid>, BatchOutcome)>,
) -> (NormalizedSchedules, usize) {
    let mut by_id: HashMap<Uuid, WeeklySchedule> = HashMap::with_capacity(outlets.len());
    let mut result = NormalizedSchedules::default();
    let mut succeeded = 0usize;

    for (index, ids, outcome) in finished {
        let records = match outcome {
            BatchOutcome::Done(records) => records,
            BatchOutcome::Failed(e) => {
                tracing::warn!(
                    batch = index,
                    outlets = ids.len(),
                    error = %e,
                    "normalize: batch failed"
                );
                continue;
            }
            BatchOutcome::TimedOut => {
                tracing::warn!(
                    batch = index,
                    outlets = ids.len(),
                    "normalize: batch timed out"
                );
                continue;
            }
        };
        succeeded += 1;

        for record in records {
            if !ids.contains(&record.outlet_id) {
                tracing::warn!(
                    batch = index,
                    outlet_id = %record.outlet_id,
                    "normalize: dropping record for outlet outside batch"
                );
                continue;
            }
            if by_id.contains_key(&record.outlet_id) {
                tracing::warn!(
                    batch = index,
                    outlet_id = %record.outlet_id,
                    "normalize: duplicate record, keeping first"
                );
                continue;
            }
            let parsed = parse_record(record.outlet_id, &record);
            result.unparsed_fields += parsed.unparsed_fields;
            result.rejected_pairs += parsed.rejected_pairs;
            by_id.insert(record.outlet_id, parsed.schedule);
        }
    }

    result.schedules = Vec::with_capacity(outlets.len());
    for outlet in outlets {
        if let Some(schedule) = by_id.remove(&outlet.id) {
            result.schedules.push(schedule);
        } else {
            result.missing.push(outlet.id);
            result.schedules.push(WeeklySchedule::empty(outlet.id));
        }
    }
    (result, succeeded)
}

#[cfg(test)]
#[path = "normalizer_test.rs"]
mod tests;
