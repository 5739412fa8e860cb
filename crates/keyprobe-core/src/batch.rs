//! Bounded-concurrency batch verification
//!
//! Credentials are probed in consecutive windows of `concurrency` items.
//! Every probe in a window runs concurrently (each with its own retry loop),
//! and the next window starts only after the whole current window settled,
//! so at most `concurrency` requests are ever in flight. Session counters
//! are bumped once per window, which means pollers only ever observe window
//! boundaries.

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::credential::{non_blank, Credential};
use crate::error::{KeyprobeError, Result};
use crate::probe::{ProbeOutcome, ProbeTarget, Prober};
use crate::session::SessionStore;

/// Upper bound on in-flight probes per batch
pub const MAX_CONCURRENCY: usize = 50;
/// Window size when the request does not name one
pub const DEFAULT_CONCURRENCY: usize = 5;
/// Upper bound on extra attempts per credential
pub const MAX_RETRIES: u32 = 3;
/// Extra attempts when the request does not name a count
pub const DEFAULT_RETRIES: u32 = 1;
/// Pause between attempts for the same credential
pub const RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Validated window size and retry count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchParams {
    concurrency: usize,
    retries: u32,
}

impl BatchParams {
    /// Build from client-declared values.
    ///
    /// Non-positive concurrency and negative retries are rejected; values
    /// above the ceilings are clamped; absent values take the defaults.
    pub fn from_request(concurrency: Option<i64>, retries: Option<i64>) -> Result<Self> {
        let concurrency = match concurrency {
            None => DEFAULT_CONCURRENCY,
            Some(n) if n < 1 => {
                return Err(KeyprobeError::Validation(format!(
                    "concurrency must be between 1 and {}, got {}",
                    MAX_CONCURRENCY, n
                )))
            }
            Some(n) => usize::try_from(n).unwrap_or(MAX_CONCURRENCY).min(MAX_CONCURRENCY),
        };

        let retries = match retries {
            None => DEFAULT_RETRIES,
            Some(n) if n < 0 => {
                return Err(KeyprobeError::Validation(format!(
                    "retries must be between 0 and {}, got {}",
                    MAX_RETRIES, n
                )))
            }
            Some(n) => u32::try_from(n).unwrap_or(MAX_RETRIES).min(MAX_RETRIES),
        };

        Ok(Self {
            concurrency,
            retries,
        })
    }

    /// Build from already-typed values, applying the same policy
    pub fn new(concurrency: usize, retries: u32) -> Result<Self> {
        Self::from_request(
            Some(i64::try_from(concurrency).unwrap_or(i64::MAX)),
            Some(i64::from(retries)),
        )
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }
}

impl Default for BatchParams {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            retries: DEFAULT_RETRIES,
        }
    }
}

/// Aggregated result of a batch run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub session_id: String,
    pub total: u64,
    pub tested: u64,
    /// Credentials that passed, in input order
    pub valid: Vec<Credential>,
    /// Failed credentials grouped by the status code of their last attempt
    pub invalid: BTreeMap<String, Vec<Credential>>,
}

impl BatchResult {
    pub fn new(session_id: String, total: u64) -> Self {
        Self {
            session_id,
            total,
            tested: 0,
            valid: Vec::new(),
            invalid: BTreeMap::new(),
        }
    }

    /// Fold one credential's final outcome into the result
    pub fn record(&mut self, credential: Credential, outcome: &ProbeOutcome) {
        self.tested += 1;
        if outcome.succeeded {
            self.valid.push(credential);
        } else {
            self.invalid
                .entry(outcome.group_key())
                .or_default()
                .push(credential);
        }
    }

    /// Number of failed credentials across all groups
    pub fn invalid_count(&self) -> usize {
        self.invalid.values().map(Vec::len).sum()
    }
}

/// A registered batch that has not been probed yet
#[derive(Debug)]
pub struct BatchJob {
    session_id: String,
    credentials: Vec<Credential>,
}

impl BatchJob {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn total(&self) -> u64 {
        self.credentials.len() as u64
    }

    /// Empty result carrying this job's id and total
    pub fn initial_result(&self) -> BatchResult {
        BatchResult::new(self.session_id.clone(), self.total())
    }
}

/// Drives the prober over a batch and reports into the session store
#[derive(Clone)]
pub struct BatchVerifier {
    prober: Arc<dyn Prober>,
    sessions: Arc<SessionStore>,
    backoff: Duration,
}

impl BatchVerifier {
    pub fn new(prober: Arc<dyn Prober>, sessions: Arc<SessionStore>) -> Self {
        Self {
            prober,
            sessions,
            backoff: RETRY_BACKOFF,
        }
    }

    /// Override the pause between attempts
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Drop blank entries and register a session.
    ///
    /// Fails without side effects when nothing is left to verify.
    pub fn open_session(&self, credentials: Vec<Credential>) -> Result<BatchJob> {
        let credentials = non_blank(credentials);
        if credentials.is_empty() {
            return Err(KeyprobeError::Validation(
                "credential list is empty".to_string(),
            ));
        }
        let session_id = self.sessions.create(credentials.len() as u64);
        Ok(BatchJob {
            session_id,
            credentials,
        })
    }

    /// Probe every credential of `job` and complete its session
    pub async fn run(&self, job: BatchJob, target: &ProbeTarget, params: BatchParams) -> BatchResult {
        let mut result = job.initial_result();
        info!(
            session = %job.session_id,
            total = result.total,
            concurrency = params.concurrency(),
            retries = params.retries(),
            endpoint = %target.endpoint,
            "Batch verification started"
        );

        for (index, window) in job.credentials.chunks(params.concurrency()).enumerate() {
            let outcomes = join_all(
                window
                    .iter()
                    .map(|credential| self.probe_with_retry(credential, target, params.retries())),
            )
            .await;

            let (mut valid, mut invalid) = (0u64, 0u64);
            for (credential, outcome) in window.iter().zip(outcomes) {
                if outcome.succeeded {
                    valid += 1;
                } else {
                    invalid += 1;
                }
                result.record(credential.clone(), &outcome);
            }

            if let Err(e) = self.sessions.record_window(&job.session_id, valid, invalid) {
                warn!(session = %job.session_id, "Failed to record window progress: {}", e);
            }
            debug!(
                session = %job.session_id,
                window = index,
                valid,
                invalid,
                tested = result.tested,
                "Window finished"
            );
        }

        if let Err(e) = self.sessions.complete(&job.session_id, result.clone()) {
            warn!(session = %job.session_id, "Failed to complete session: {}", e);
        }
        info!(
            session = %job.session_id,
            tested = result.tested,
            valid = result.valid.len(),
            invalid = result.invalid_count(),
            "Batch verification completed"
        );
        result
    }

    /// Register and run a batch, waiting for the final result
    pub async fn verify_batch(
        &self,
        credentials: Vec<Credential>,
        target: &ProbeTarget,
        params: BatchParams,
    ) -> Result<BatchResult> {
        let job = self.open_session(credentials)?;
        Ok(self.run(job, target, params).await)
    }

    /// Attempt, then retry up to `retries` more times with a fixed backoff
    async fn probe_with_retry(
        &self,
        credential: &Credential,
        target: &ProbeTarget,
        retries: u32,
    ) -> ProbeOutcome {
        let mut attempt = 0;
        loop {
            let outcome = self.prober.probe(credential, target).await;
            if outcome.succeeded || attempt >= retries {
                return outcome;
            }
            attempt += 1;
            debug!(
                credential = %credential,
                status = outcome.status_code,
                attempt,
                "Probe failed, retrying"
            );
            tokio::time::sleep(self.backoff).await;
        }
    }
}
