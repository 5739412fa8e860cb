//! Keyprobe Core - credential verification and stress-test engine
//!
//! This crate checks bearer-token credentials against an OpenAI-style
//! chat-completion endpoint and runs long, evenly paced stress tests on a
//! single credential.
//!
//! # Modules
//!
//! - [`credential`] - Credential newtype with masked display
//! - [`probe`] - One verification attempt ([`Prober`] trait, [`HttpProber`])
//! - [`batch`] - Bounded-concurrency batch verification with retry
//! - [`session`] - Progress sessions for batch runs, with expiry sweep
//! - [`stress`] - Per-credential stress-test scheduler
//! - [`rating`] - Rating of finished stress tests
//! - [`config`] - Configuration types
//! - [`error`] - Error types
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use keyprobe_core::{
//!     BatchParams, BatchVerifier, Credential, HttpProber, ProbeConfig, ProbeTarget, SessionStore,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let prober = Arc::new(HttpProber::new(ProbeConfig::default())?);
//!     let verifier = BatchVerifier::new(prober, Arc::new(SessionStore::new()));
//!
//!     let target = ProbeTarget::new("https://api.openai.com/v1", "gpt-3.5-turbo");
//!     let keys = vec![Credential::new("sk-first"), Credential::new("sk-second")];
//!     let result = verifier.verify_batch(keys, &target, BatchParams::default()).await?;
//!
//!     println!("{} valid, {} invalid", result.valid.len(), result.invalid_count());
//!     Ok(())
//! }
//! ```

pub mod batch;
pub mod config;
pub mod credential;
pub mod error;
pub mod probe;
pub mod rating;
pub mod session;
pub mod stress;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Re-exports for convenience
pub use batch::{BatchJob, BatchParams, BatchResult, BatchVerifier};
pub use config::{KeyprobeConfig, ProbeConfig, ServerConfig};
pub use credential::Credential;
pub use error::{KeyprobeError, Result};
pub use probe::{HttpProber, ProbeOutcome, ProbeTarget, Prober};
pub use rating::Rating;
pub use session::{ProgressSession, SessionStore};
pub use stress::{StressScheduler, StressSnapshot, StressStatus, StressStarted, StressStopped};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
