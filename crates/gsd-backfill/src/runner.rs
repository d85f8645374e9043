use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use gsd_core::constants::{BACKFILL_BATCH_DELAY_MS, BACKFILL_BATCH_SIZE};
use gsd_core::entities::Contribution;
use gsd_core::error::GsdError;
use gsd_core::types::Timestamp;
use gsd_state::StateDb;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::scoring::{ai_report, legacy_report, ArtifactSource, Scorer, ScoringWeights};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackfillState {
    Idle,
    Running,
    Completed,
    Cancelled,
}

/// Snapshot of the current (or last) run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackfillStatus {
    pub state: BackfillState,
    pub total: u64,
    pub processed: u64,
    pub pending: u64,
    pub failed: u64,
    pub legacy_tagged: u64,
    pub started_at: Option<Timestamp>,
    pub last_processed_at: Option<Timestamp>,
    pub estimated_completion_hours: Option<f64>,
}

impl BackfillStatus {
    fn idle() -> Self {
        Self {
            state: BackfillState::Idle,
            total: 0,
            processed: 0,
            pending: 0,
            failed: 0,
            legacy_tagged: 0,
            started_at: None,
            last_processed_at: None,
            estimated_completion_hours: None,
        }
    }

    /// Remaining time at the observed rate, to a tenth of an hour.
    fn estimate(&self, now: Timestamp) -> Option<f64> {
        let started = self.started_at?;
        let elapsed = now - started;
        if self.state != BackfillState::Running || self.processed == 0 || elapsed <= 0 {
            return None;
        }
        let per_item = elapsed as f64 / self.processed as f64;
        let hours = self.pending as f64 * per_item / 3_600.0;
        Some((hours * 10.0).round() / 10.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackfillConfig {
    pub batch_size: usize,
    pub batch_delay: Duration,
    pub weights: ScoringWeights,
}

impl Default for BackfillConfig {
    fn default() -> Self {
        Self {
            batch_size: BACKFILL_BATCH_SIZE,
            batch_delay: Duration::from_millis(BACKFILL_BATCH_DELAY_MS),
            weights: ScoringWeights::default(),
        }
    }
}

/// Supervises backfill runs. At most one run is in flight.
pub struct BackfillRunner {
    db: Arc<StateDb>,
    scorer: Arc<dyn Scorer>,
    artifacts: Arc<dyn ArtifactSource>,
    config: BackfillConfig,
    status: Mutex<BackfillStatus>,
    cancel: AtomicBool,
    wake: Notify,
}

fn now() -> Timestamp {
    chrono::Utc::now().timestamp()
}

impl BackfillRunner {
    pub fn new(
        db: Arc<StateDb>,
        scorer: Arc<dyn Scorer>,
        artifacts: Arc<dyn ArtifactSource>,
        config: BackfillConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            db,
            scorer,
            artifacts,
            config,
            status: Mutex::new(BackfillStatus::idle()),
            cancel: AtomicBool::new(false),
            wake: Notify::new(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, BackfillStatus> {
        // The status is plain counters; a panic mid-update leaves it usable.
        self.status.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn status(&self) -> BackfillStatus {
        let mut status = self.lock().clone();
        status.estimated_completion_hours = status.estimate(now());
        status
    }

    /// Contributions with no report for their (task, wallet).
    fn candidates(&self) -> Result<Vec<Contribution>, GsdError> {
        let mut out = Vec::new();
        for c in self.db.list_contributions()? {
            if self.db.find_report_for_task(&c.task_ref, &c.wallet_address)?.is_none() {
                out.push(c);
            }
        }
        Ok(out)
    }

    /// Begin a run in the background. Rejected while one is running.
    ///
    /// The handle resolves to the final status.
    pub fn start(self: &Arc<Self>) -> Result<JoinHandle<BackfillStatus>, GsdError> {
        {
            let mut status = self.lock();
            if status.state == BackfillState::Running {
                return Err(GsdError::BackfillInProgress);
            }
            *status = BackfillStatus {
                state: BackfillState::Running,
                started_at: Some(now()),
                ..BackfillStatus::idle()
            };
            self.cancel.store(false, Ordering::SeqCst);
        }

        // The scan runs unlocked; the Running state above already keeps other starts out.
        let candidates = match self.candidates() {
            Ok(candidates) => candidates,
            Err(e) => {
                self.lock().state = BackfillState::Idle;
                return Err(e);
            }
        };
        {
            let mut status = self.lock();
            status.total = candidates.len() as u64;
            status.pending = candidates.len() as u64;
        }
        info!(total = candidates.len(), batch_size = self.config.batch_size, "backfill started");

        let runner = Arc::clone(self);
        Ok(tokio::spawn(async move { runner.run(candidates).await }))
    }

    /// Ask the running job to stop. Returns `false` when nothing is running.
    pub fn cancel(&self) -> bool {
        {
            let status = self.lock();
            if status.state != BackfillState::Running {
                return false;
            }
            self.cancel.store(true, Ordering::SeqCst);
        }
        // Only wakes a pause already waiting; no permit outlives this run.
        self.wake.notify_waiters();
        info!("backfill cancellation requested");
        true
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    async fn run(&self, candidates: Vec<Contribution>) -> BackfillStatus {
        let _guard = RunGuard { runner: self };
        let batch_size = self.config.batch_size.max(1);
        let batches = candidates.len().div_ceil(batch_size);

        for (n, batch) in candidates.chunks(batch_size).enumerate() {
            if self.cancelled() {
                break;
            }
            info!(batch = n + 1, batches, items = batch.len(), "backfill batch");

            for contribution in batch {
                if self.cancelled() {
                    break;
                }
                let outcome = self.process(contribution).await;
                let mut status = self.lock();
                status.pending = status.pending.saturating_sub(1);
                match outcome {
                    Ok(legacy) => {
                        status.processed += 1;
                        if legacy {
                            status.legacy_tagged += 1;
                        }
                    }
                    Err(e) => {
                        warn!(
                            signature = %contribution.transaction_signature,
                            wallet = %contribution.wallet_address,
                            error = %e,
                            "backfill item failed"
                        );
                        status.failed += 1;
                    }
                }
                status.last_processed_at = Some(now());
            }

            {
                let status = self.lock();
                info!(
                    processed = status.processed,
                    total = status.total,
                    legacy = status.legacy_tagged,
                    failed = status.failed,
                    "backfill progress"
                );
            }

            if n + 1 < batches {
                // Register for the wake before re-checking the flag so a
                // cancel landing in between is not lost.
                let wake = self.wake.notified();
                tokio::pin!(wake);
                wake.as_mut().enable();
                if !self.cancelled() {
                    tokio::select! {
                        _ = tokio::time::sleep(self.config.batch_delay) => {}
                        _ = wake => {}
                    }
                }
            }
        }

        let mut status = self.lock();
        status.state = if self.cancelled() { BackfillState::Cancelled } else { BackfillState::Completed };
        info!(
            state = ?status.state,
            processed = status.processed,
            legacy = status.legacy_tagged,
            failed = status.failed,
            "backfill finished"
        );
        status.clone()
    }

    /// Store a report for one contribution. Returns `true` when it was
    /// tagged legacy.
    async fn process(&self, contribution: &Contribution) -> Result<bool, GsdError> {
        let now = now();
        let (report, legacy) = match self.artifacts.recover(contribution).await? {
            None => (legacy_report(contribution, now), true),
            Some(artifacts) => {
                let scored = self.scorer.score(&contribution.task_ref, &artifacts).await?;
                (ai_report(contribution, &scored, &self.config.weights, now), false)
            }
        };
        self.db.upsert_report(&report)?;
        Ok(legacy)
    }
}

/// Leaves the job out of `Running` if a run ends without finishing,
/// by panic or by its task being dropped.
struct RunGuard<'a> {
    runner: &'a BackfillRunner,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        let mut status = self.runner.lock();
        if status.state == BackfillState::Running {
            status.state = BackfillState::Cancelled;
            warn!(processed = status.processed, "backfill run aborted");
        }
    }
}
