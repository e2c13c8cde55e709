//! Background ingestion scheduling.
//!
//! [`IngestScheduler`] checks staleness once at startup and then triggers the
//! orchestrator every freshness window. Both paths go through the
//! orchestrator's run guard, so an overlapping trigger is skipped rather than
//! queued.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use outletdb_ingest::{IngestError, Orchestrator, RunOutcome, StalenessGate};
use tokio::task::JoinHandle;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use tokio_util::sync::CancellationToken;

pub struct IngestScheduler {
    orchestrator: Arc<Orchestrator>,
    gate: StalenessGate,
    period: Duration,
    cancel: CancellationToken,
    jobs: Option<JobScheduler>,
    startup: Option<JoinHandle<()>>,
}

impl IngestScheduler {
    #[must_use]
    pub fn new(orchestrator: Arc<Orchestrator>, gate: StalenessGate, period: Duration) -> Self {
        Self {
            orchestrator,
            gate,
            period,
            cancel: CancellationToken::new(),
            jobs: None,
            startup: None,
        }
    }

    /// Spawns the startup gate check and registers the repeated job.
    ///
    /// # Errors
    ///
    /// Returns [`JobSchedulerError`] if the job scheduler cannot be created,
    /// the job cannot be registered, or the scheduler fails to start.
    pub async fn start(&mut self) -> Result<(), JobSchedulerError> {
        self.startup = Some(tokio::spawn(startup_check(
            Arc::clone(&self.orchestrator),
            self.gate.clone(),
            self.cancel.clone(),
        )));

        let scheduler = JobScheduler::new().await?;
        let orchestrator = Arc::clone(&self.orchestrator);
        let cancel = self.cancel.clone();
        let job = Job::new_repeated_async(self.period, move |_uuid, _lock| {
            let orchestrator = Arc::clone(&orchestrator);
            let cancel = cancel.clone();
            Box::pin(async move {
                if cancel.is_cancelled() {
                    return;
                }
                tracing::info!("scheduler: periodic ingestion triggered");
                log_outcome("periodic", orchestrator.run().await);
            })
        })?;
        scheduler.add(job).await?;
        scheduler.start().await?;

        tracing::info!(
            period_secs = self.period.as_secs(),
            "scheduler: ingestion scheduler started"
        );
        self.jobs = Some(scheduler);
        Ok(())
    }

    /// Stops issuing triggers and waits up to `grace` for an in-flight run.
    ///
    /// Returns `false` if the grace period ran out first; the caller exits
    /// anyway and the uncommitted transaction rolls back.
    pub async fn stop(&mut self, grace: Duration) -> bool {
        self.cancel.cancel();
        self.orchestrator.close();
        if let Some(mut jobs) = self.jobs.take() {
            if let Err(e) = jobs.shutdown().await {
                tracing::warn!(error = %e, "scheduler: job scheduler shutdown failed");
            }
        }

        let drained = tokio::time::timeout(grace, self.orchestrator.wait_idle())
            .await
            .is_ok();
        if drained {
            tracing::info!("scheduler: stopped; no ingestion in flight");
        } else {
            tracing::warn!(
                grace_secs = grace.as_secs(),
                stage = %self.orchestrator.stage(),
                "scheduler: shutdown grace elapsed; abandoning in-flight ingestion"
            );
        }

        if let Some(handle) = self.startup.take() {
            handle.abort();
        }
        drained
    }
}

/// Runs the orchestrator once if the data is stale, unless shutdown begins
/// before the trigger.
async fn startup_check(
    orchestrator: Arc<Orchestrator>,
    gate: StalenessGate,
    cancel: CancellationToken,
) {
    let decision = tokio::select! {
        () = cancel.cancelled() => return,
        decision = gate.check(Utc::now()) => decision,
    };
    if !decision.is_stale() {
        tracing::info!(?decision, "scheduler: data fresh at startup; waiting for next tick");
        return;
    }
    if cancel.is_cancelled() {
        return;
    }
    tracing::info!(?decision, "scheduler: data stale at startup; triggering ingestion");
    log_outcome("startup", orchestrator.run().await);
}

/// Scheduled runs never propagate errors; the next trigger is the retry.
fn log_outcome(trigger: &'static str, result: Result<RunOutcome, IngestError>) {
    match result {
        Ok(RunOutcome::Completed(report)) => tracing::info!(
            trigger,
            outlets = report.outlets,
            overlaps = report.overlaps,
            failed_batches = report.failed_batches,
            "scheduler: ingestion completed"
        ),
        Ok(RunOutcome::Skipped) => {
            tracing::info!(trigger, "scheduler: ingestion already running; trigger skipped");
        }
        Err(e) => tracing::error!(trigger, error = %e, "scheduler: ingestion failed"),
    }
}

#[cfg(test)]
#[path = "scheduler_test.rs"]
mod tests;
