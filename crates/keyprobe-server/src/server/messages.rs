//! Request and response bodies of the JSON API

use keyprobe_core::{Credential, StressSnapshot};
use serde::{Deserialize, Serialize};

/// Body of `POST /verify`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    #[serde(alias = "keys")]
    pub credentials: Option<Vec<Credential>>,
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub concurrency: Option<i64>,
    pub retries: Option<i64>,
}

/// Body of the `/stress/*` endpoints
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StressRequest {
    #[serde(alias = "apiKey")]
    pub credential: Option<Credential>,
    pub endpoint: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StressStartResponse {
    pub message: String,
    /// Epoch milliseconds
    pub start_time: i64,
}

/// Answer of `POST /stress/query`.
///
/// Snapshot fields are flattened into the top level when a job exists.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StressQueryResponse {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub snapshot: Option<StressSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating_label: Option<&'static str>,
}

impl StressQueryResponse {
    pub fn missing() -> Self {
        Self {
            found: false,
            message: Some("no stress test found for this credential".to_string()),
            snapshot: None,
            rating_label: None,
        }
    }
}

impl From<StressSnapshot> for StressQueryResponse {
    fn from(snapshot: StressSnapshot) -> Self {
        Self {
            found: true,
            message: None,
            rating_label: snapshot.rating.map(|r| r.label()),
            snapshot: Some(snapshot),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StressStopResponse {
    pub message: String,
    pub success_count: u64,
    pub total_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInfo {
    pub version: &'static str,
    pub active_sessions: usize,
    pub stress_jobs: usize,
    pub running_stress_jobs: usize,
    pub uptime_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnouncementResponse {
    pub has_announcement: bool,
    pub content: String,
}
