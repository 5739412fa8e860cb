//! Keyprobe Server - HTTP front end for the keyprobe engine
//!
//! Exposes batch verification with progress polling, per-credential stress
//! tests and a few service endpoints over a JSON API.

pub mod server;

use std::sync::Arc;
use std::time::Instant;

use keyprobe_core::{BatchVerifier, ProbeTarget, Prober, ServerConfig, SessionStore, StressScheduler};

/// Application state shared across handlers
pub struct AppState {
    /// Progress sessions of batch runs
    pub sessions: Arc<SessionStore>,
    /// Batch verifier writing into `sessions`
    pub verifier: BatchVerifier,
    /// Stress-test job table
    pub stress: Arc<StressScheduler>,
    /// Server configuration
    pub config: ServerConfig,
    /// Service start time
    pub start_time: Instant,
}

impl AppState {
    pub fn new(prober: Arc<dyn Prober>, config: ServerConfig) -> Self {
        let sessions = Arc::new(SessionStore::new());
        Self {
            verifier: BatchVerifier::new(prober.clone(), sessions.clone()),
            stress: Arc::new(StressScheduler::new(prober)),
            sessions,
            config,
            start_time: Instant::now(),
        }
    }

    /// Probe target from request fields, falling back to configured defaults
    pub fn target(&self, endpoint: Option<String>, model: Option<String>) -> ProbeTarget {
        let endpoint = endpoint
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| self.config.default_endpoint.clone());
        let model = model
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| self.config.default_model.clone());
        ProbeTarget::new(endpoint, model)
    }
}
