//! Decides whether the persisted dataset is old enough to warrant a run.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use crate::error::IngestError;
use crate::orchestrator::{Orchestrator, RunOutcome};
use crate::traits::DatasetStore;

/// True iff there is no marker or `now - marker` is strictly greater than
/// `window`.
///
/// A marker in the future counts as fresh.
#[must_use]
pub fn is_stale(marker: Option<DateTime<Utc>>, now: DateTime<Utc>, window: Duration) -> bool {
    let Some(marker) = marker else {
        return true;
    };
    match TimeDelta::from_std(window) {
        Ok(window) => now.signed_duration_since(marker) > window,
        // A window too large for chrono never elapses.
        Err(_) => false,
    }
}

/// Result of one gate evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Fresh {
        last_ingested_at: DateTime<Utc>,
    },
    /// `last_ingested_at` is `None` when no run has ever succeeded or the
    /// marker could not be read.
    Stale {
        last_ingested_at: Option<DateTime<Utc>>,
    },
}

impl GateDecision {
    #[must_use]
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Stale { .. })
    }
}

/// Staleness check against the marker in a [`DatasetStore`].
#[derive(Clone)]
pub struct StalenessGate {
    store: Arc<dyn DatasetStore>,
    window: Duration,
}

impl StalenessGate {
    #[must_use]
    pub fn new(store: Arc<dyn DatasetStore>, window: Duration) -> Self {
        Self { store, window }
    }

    #[must_use]
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Reads the marker and compares it against `now`.
    ///
    /// A failed marker read is logged and treated as stale.
    pub async fn check(&self, now: DateTime<Utc>) -> GateDecision {
        let marker = match self.store.last_ingested_at().await {
            Ok(marker) => marker,
            Err(e) => {
                tracing::warn!(error = %e, "gate: could not read staleness marker; treating as stale");
                return GateDecision::Stale {
                    last_ingested_at: None,
                };
            }
        };

        match marker {
            Some(at) if !is_stale(Some(at), now, self.window) => GateDecision::Fresh {
                last_ingested_at: at,
            },
            _ => GateDecision::Stale {
                last_ingested_at: marker,
            },
        }
    }

    /// Triggers `orchestrator` only when the data is stale.
    ///
    /// Returns `Ok(None)` when the data was fresh and nothing ran.
    ///
    /// # Errors
    ///
    /// Returns the [`IngestError`] of a run that was triggered and failed.
    pub async fn run_if_stale(
        &self,
        orchestrator: &Orchestrator,
    ) -> Result<Option<RunOutcome>, IngestError> {
        match self.check(Utc::now()).await {
            GateDecision::Fresh { last_ingested_at } => {
                tracing::info!(
                    last_ingested_at = %last_ingested_at,
                    window_secs = self.window.as_secs(),
                    "gate: data is fresh; skipping ingestion"
                );
                Ok(None)
            }
            GateDecision::Stale { last_ingested_at } => {
                tracing::info!(
                    last_ingested_at = ?last_ingested_at,
                    window_secs = self.window.as_secs(),
                    "gate: data is stale; triggering ingestion"
                );
                orchestrator.run().await.map(Some)
            }
        }
    }
}
