//! Progress session store
//!
//! Every batch verification run gets a [`ProgressSession`] that pollers read
//! while the run is in flight. Only the run that created a session writes to
//! it: counters move forward once per finished window, and the session is
//! completed exactly once. Completed sessions are kept for an hour so late
//! pollers can still fetch the final result, then a background sweep drops
//! them.

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::batch::BatchResult;
use crate::error::{KeyprobeError, Result};

/// How long a completed session stays readable
pub const SESSION_RETENTION: Duration = Duration::from_secs(60 * 60);

/// How often the sweeper scans for expired sessions
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Progress of one batch verification run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSession {
    pub id: String,
    pub total: u64,
    pub tested: u64,
    pub valid_count: u64,
    pub invalid_count: u64,
    pub completed: bool,
    /// Completion time, epoch milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_result: Option<BatchResult>,
    /// Monotonic completion time, drives expiry
    #[serde(skip)]
    completed_instant: Option<Instant>,
}

impl ProgressSession {
    fn new(id: String, total: u64) -> Self {
        Self {
            id,
            total,
            tested: 0,
            valid_count: 0,
            invalid_count: 0,
            completed: false,
            completed_at: None,
            final_result: None,
            completed_instant: None,
        }
    }

    fn is_expired(&self, now: Instant, retention: Duration) -> bool {
        match self.completed_instant {
            Some(at) if self.completed => now.saturating_duration_since(at) > retention,
            _ => false,
        }
    }
}

/// Process-wide table of progress sessions
pub struct SessionStore {
    sessions: RwLock<HashMap<String, ProgressSession>>,
    /// Last issued id, used to keep ids strictly increasing
    last_id: AtomicI64,
    retention: Duration,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_retention(SESSION_RETENTION)
    }

    pub fn with_retention(retention: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            last_id: AtomicI64::new(0),
            retention,
        }
    }

    /// Epoch-millisecond id, bumped past the previous one when needed
    fn next_id(&self) -> String {
        let now = Utc::now().timestamp_millis();
        let mut last = self.last_id.load(Ordering::SeqCst);
        loop {
            let candidate = now.max(last + 1);
            match self
                .last_id
                .compare_exchange(last, candidate, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return candidate.to_string(),
                Err(current) => last = current,
            }
        }
    }

    /// Register a new run over `total` credentials
    pub fn create(&self, total: u64) -> String {
        let id = self.next_id();
        self.sessions
            .write()
            .insert(id.clone(), ProgressSession::new(id.clone(), total));
        debug!(session = %id, total, "Progress session created");
        id
    }

    /// Snapshot of a session
    pub fn get(&self, id: &str) -> Option<ProgressSession> {
        self.sessions.read().get(id).cloned()
    }

    /// Apply the results of one finished window
    pub fn record_window(&self, id: &str, valid: u64, invalid: u64) -> Result<()> {
        let mut sessions = self.sessions.write();
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| KeyprobeError::not_found("session", id))?;

        if session.completed {
            return Err(KeyprobeError::InvalidState(format!(
                "session {} is already completed",
                id
            )));
        }
        let tested = session.tested + valid + invalid;
        if tested > session.total {
            return Err(KeyprobeError::Internal(format!(
                "session {} would record {} of {} credentials",
                id, tested, session.total
            )));
        }

        session.tested = tested;
        session.valid_count += valid;
        session.invalid_count += invalid;
        Ok(())
    }

    /// Mark a session completed and attach its final result
    pub fn complete(&self, id: &str, result: BatchResult) -> Result<()> {
        let mut sessions = self.sessions.write();
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| KeyprobeError::not_found("session", id))?;

        if session.completed {
            return Err(KeyprobeError::InvalidState(format!(
                "session {} is already completed",
                id
            )));
        }

        session.completed = true;
        session.completed_at = Some(Utc::now().timestamp_millis());
        session.completed_instant = Some(Instant::now());
        session.final_result = Some(result);
        Ok(())
    }

    /// Drop completed sessions older than the retention window
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let retention = self.retention;
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired(now, retention));
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Spawn the periodic sweep task
    pub fn spawn_sweeper(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + every, every);
            loop {
                ticker.tick().await;
                let removed = self.sweep();
                if removed > 0 {
                    info!(removed, remaining = self.len(), "Swept expired progress sessions");
                }
            }
        })
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
