//! Test utilities: a scripted in-memory [`Prober`]
//!
//! Available in unit tests and, for downstream crates, with the
//! `test-utils` feature.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::credential::Credential;
use crate::probe::{ProbeOutcome, ProbeTarget, Prober};

/// Prober that replays per-credential scripts.
///
/// Each credential gets a queue of outcomes; the last outcome repeats once
/// the queue is down to one entry. Credentials without a script get the
/// fallback outcome (success unless changed).
pub struct ScriptedProber {
    scripts: Mutex<HashMap<String, VecDeque<ProbeOutcome>>>,
    fallback: ProbeOutcome,
    latency: Duration,
    calls: Mutex<HashMap<String, usize>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedProber {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            fallback: ProbeOutcome::success(200),
            latency: Duration::ZERO,
            calls: Mutex::new(HashMap::new()),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Outcome for credentials without a script
    pub fn with_fallback(mut self, outcome: ProbeOutcome) -> Self {
        self.fallback = outcome;
        self
    }

    /// Simulated network latency per probe
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Replay `outcomes` in order for `token`, repeating the last one
    pub fn script(self, token: &str, outcomes: Vec<ProbeOutcome>) -> Self {
        self.scripts
            .lock()
            .insert(token.to_string(), outcomes.into_iter().collect());
        self
    }

    /// Always answer `outcome` for `token`
    pub fn always(self, token: &str, outcome: ProbeOutcome) -> Self {
        self.script(token, vec![outcome])
    }

    /// Number of probes sent for `token`
    pub fn calls(&self, token: &str) -> usize {
        self.calls.lock().get(token).copied().unwrap_or(0)
    }

    /// Number of probes sent overall
    pub fn total_calls(&self) -> usize {
        self.calls.lock().values().sum()
    }

    /// Highest number of probes observed in flight at once
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn next_outcome(&self, token: &str) -> ProbeOutcome {
        let mut scripts = self.scripts.lock();
        match scripts.get_mut(token) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_else(|| self.fallback.clone()),
            Some(queue) => queue.front().cloned().unwrap_or_else(|| self.fallback.clone()),
            None => self.fallback.clone(),
        }
    }
}

impl Default for ScriptedProber {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn probe(&self, credential: &Credential, _target: &ProbeTarget) -> ProbeOutcome {
        let token = credential.expose();
        *self.calls.lock().entry(token.to_string()).or_insert(0) += 1;

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let outcome = self.next_outcome(token);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        outcome
    }
}
