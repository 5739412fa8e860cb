//! Long-running per-credential stress tests
//!
//! A stress job probes one credential every 30 seconds for two hours. The
//! even cadence is the stimulus: it measures how a provider rate-limits a
//! key under sustained load rather than under bursts.
//!
//! Per credential the job moves through
//!
//! ```text
//! absent -> running -> completed   (duration ceiling reached)
//!                   -> stopped     (explicit stop)
//! ```
//!
//! and the entry is removed 24 hours after it started, whatever its status.
//! Each job's ticker is a task holding a [`CancellationToken`]; `stop` and
//! expiry cancel it, and every tick still re-checks the table entry before
//! touching the counters, so a tick racing a cancellation is harmless.

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::credential::Credential;
use crate::error::{KeyprobeError, Result};
use crate::probe::{ProbeTarget, Prober};
use crate::rating::Rating;

/// Time between two probes of the same job
pub const TICK_INTERVAL: Duration = Duration::from_secs(30);

/// Duration after which a running job completes
pub const TEST_DURATION: Duration = Duration::from_secs(2 * 60 * 60);

/// [`TEST_DURATION`] in minutes, as reported to clients
pub const TEST_DURATION_MINUTES: u64 = 120;

/// Time after start at which a job's entry is deleted
pub const JOB_RETENTION: Duration = Duration::from_secs(24 * 60 * 60);

/// Lifecycle state of a stress job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StressStatus {
    Running,
    Completed,
    Stopped,
}

impl std::fmt::Display for StressStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StressStatus::Running => write!(f, "running"),
            StressStatus::Completed => write!(f, "completed"),
            StressStatus::Stopped => write!(f, "stopped"),
        }
    }
}

/// Table entry for one credential
#[derive(Debug)]
struct StressJob {
    /// Distinguishes successive jobs for the same credential
    generation: u64,
    status: StressStatus,
    started_at: DateTime<Utc>,
    started: Instant,
    success_count: u64,
    total_count: u64,
    target: ProbeTarget,
    cancel: CancellationToken,
}

impl StressJob {
    fn is_current(&self, generation: u64) -> bool {
        self.generation == generation && self.status == StressStatus::Running
    }

    fn snapshot(&self, now: Instant) -> StressSnapshot {
        let elapsed_minutes = now.saturating_duration_since(self.started).as_secs() / 60;
        let rating = match self.status {
            StressStatus::Running => None,
            _ => Some(Rating::from_success_count(self.success_count)),
        };
        StressSnapshot {
            status: self.status,
            success_count: self.success_count,
            total_count: self.total_count,
            elapsed_minutes,
            remaining_minutes: TEST_DURATION_MINUTES.saturating_sub(elapsed_minutes),
            start_time: self.started_at.timestamp_millis(),
            endpoint: self.target.endpoint.clone(),
            model: self.target.model.clone(),
            rating,
        }
    }
}

/// Point-in-time view of a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StressSnapshot {
    pub status: StressStatus,
    pub success_count: u64,
    pub total_count: u64,
    pub elapsed_minutes: u64,
    pub remaining_minutes: u64,
    /// Epoch milliseconds
    pub start_time: i64,
    pub endpoint: String,
    pub model: String,
    /// Only present once the job left `running`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<Rating>,
}

/// Returned by [`StressScheduler::start`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StressStarted {
    /// Epoch milliseconds
    pub start_time: i64,
}

/// Returned by [`StressScheduler::stop`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StressStopped {
    pub success_count: u64,
    pub total_count: u64,
}

/// Owns the stress-job table and the per-job tasks
pub struct StressScheduler {
    jobs: DashMap<Credential, StressJob>,
    prober: Arc<dyn Prober>,
    next_generation: AtomicU64,
}

impl StressScheduler {
    pub fn new(prober: Arc<dyn Prober>) -> Self {
        Self {
            jobs: DashMap::new(),
            prober,
            next_generation: AtomicU64::new(0),
        }
    }

    /// Start a job for `credential`.
    ///
    /// Fails with `Conflict` while a job for the same credential is running.
    /// A completed or stopped entry is replaced.
    pub fn start(self: &Arc<Self>, credential: Credential, target: ProbeTarget) -> Result<StressStarted> {
        if credential.is_blank() {
            return Err(KeyprobeError::Validation("credential is required".to_string()));
        }

        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let cancel = CancellationToken::new();
        let started = Instant::now();
        let job = StressJob {
            generation,
            status: StressStatus::Running,
            started_at: Utc::now(),
            started,
            success_count: 0,
            total_count: 0,
            target,
            cancel: cancel.clone(),
        };
        let start_time = job.started_at.timestamp_millis();

        match self.jobs.entry(credential.clone()) {
            Entry::Occupied(mut entry) => {
                if entry.get().status == StressStatus::Running {
                    return Err(KeyprobeError::Conflict(credential.masked()));
                }
                entry.get().cancel.cancel();
                entry.insert(job);
            }
            Entry::Vacant(entry) => {
                entry.insert(job);
            }
        }

        tokio::spawn(Arc::clone(self).run_ticker(credential.clone(), generation, started, cancel));
        tokio::spawn(Arc::clone(self).expire_after(credential.clone(), generation, JOB_RETENTION));

        info!(credential = %credential, generation, "Stress test started");
        Ok(StressStarted { start_time })
    }

    /// Stop a running job, keeping its counters
    pub fn stop(&self, credential: &Credential) -> Result<StressStopped> {
        let mut job = self
            .jobs
            .get_mut(credential)
            .ok_or_else(|| KeyprobeError::not_found("stress test", credential.masked()))?;

        if job.status != StressStatus::Running {
            return Err(KeyprobeError::InvalidState(format!(
                "stress test for {} is {}, not running",
                credential, job.status
            )));
        }

        job.cancel.cancel();
        job.status = StressStatus::Stopped;
        info!(
            credential = %credential,
            success = job.success_count,
            total = job.total_count,
            "Stress test stopped"
        );
        Ok(StressStopped {
            success_count: job.success_count,
            total_count: job.total_count,
        })
    }

    /// Snapshot of the job for `credential`, if any
    pub fn query(&self, credential: &Credential) -> Option<StressSnapshot> {
        self.jobs
            .get(credential)
            .map(|job| job.snapshot(Instant::now()))
    }

    /// Number of entries, whatever their status
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Number of jobs still running
    pub fn running(&self) -> usize {
        self.jobs
            .iter()
            .filter(|job| job.status == StressStatus::Running)
            .count()
    }

    async fn run_ticker(
        self: Arc<Self>,
        credential: Credential,
        generation: u64,
        started: Instant,
        cancel: CancellationToken,
    ) {
        let mut ticker = tokio::time::interval_at(started + TICK_INTERVAL, TICK_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(credential = %credential, generation, "Stress ticker cancelled");
                    break;
                }
                _ = ticker.tick() => {}
            }
            if !self.tick(&credential, generation).await {
                break;
            }
        }
    }

    /// One firing of a job's ticker. Returns whether the ticker keeps going.
    async fn tick(&self, credential: &Credential, generation: u64) -> bool {
        let target = match self.jobs.get_mut(credential) {
            Some(mut job) if job.is_current(generation) => {
                job.total_count += 1;
                job.target.clone()
            }
            _ => return false,
        };

        let outcome = self.prober.probe(credential, &target).await;

        // The job may have been stopped, replaced or expired meanwhile
        let mut job = match self.jobs.get_mut(credential) {
            Some(job) if job.is_current(generation) => job,
            _ => return false,
        };

        if outcome.succeeded {
            job.success_count += 1;
        } else {
            debug!(
                credential = %credential,
                status = outcome.status_code,
                "Stress probe failed: {}",
                outcome.message
            );
        }

        if job.started.elapsed() >= TEST_DURATION {
            job.status = StressStatus::Completed;
            job.cancel.cancel();
            info!(
                credential = %credential,
                success = job.success_count,
                total = job.total_count,
                rating = %Rating::from_success_count(job.success_count),
                "Stress test completed"
            );
            return false;
        }
        true
    }

    async fn expire_after(self: Arc<Self>, credential: Credential, generation: u64, after: Duration) {
        tokio::time::sleep(after).await;
        if let Some((_, job)) = self
            .jobs
            .remove_if(&credential, |_, job| job.generation == generation)
        {
            job.cancel.cancel();
            info!(credential = %credential, status = %job.status, "Stress test data expired");
        }
    }
}
