//! Single verification attempt against a chat-completion endpoint
//!
//! A probe sends one minimal chat-completion request authorized with the
//! credential under test. Every failure mode (transport error, timeout,
//! non-2xx status) is folded into the returned [`ProbeOutcome`]; probing
//! never fails to its caller and keeps no state between calls.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::ProbeConfig;
use crate::credential::Credential;
use crate::error::{KeyprobeError, Result};

/// Status code reported when no HTTP response was received
pub const NO_RESPONSE: u16 = 0;

/// Result of one probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeOutcome {
    pub succeeded: bool,
    /// HTTP status, or [`NO_RESPONSE`]
    pub status_code: u16,
    pub message: String,
}

impl ProbeOutcome {
    pub fn success(status_code: u16) -> Self {
        Self {
            succeeded: true,
            status_code,
            message: "OK".to_string(),
        }
    }

    pub fn failure(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            status_code,
            message: message.into(),
        }
    }

    /// Key under which a failed credential is grouped
    pub fn group_key(&self) -> String {
        self.status_code.to_string()
    }
}

/// Where to probe: base URL and model name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeTarget {
    pub endpoint: String,
    pub model: String,
}

impl ProbeTarget {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            model: model.into(),
        }
    }

    /// `{endpoint}/chat/completions`, tolerating a trailing slash
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.endpoint.trim_end_matches('/'))
    }
}

/// Performs one verification attempt
#[async_trait]
pub trait Prober: Send + Sync {
    /// Probe `credential` against `target`. Never fails; failures are data.
    async fn probe(&self, credential: &Credential, target: &ProbeTarget) -> ProbeOutcome;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

/// [`Prober`] backed by `reqwest`
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: reqwest::Client,
    config: ProbeConfig,
}

impl HttpProber {
    pub fn new(config: ProbeConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| KeyprobeError::Internal(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    fn describe(&self, err: &reqwest::Error) -> String {
        if err.is_timeout() {
            format!(
                "request timed out after {}",
                humantime::format_duration(self.config.timeout)
            )
        } else if err.is_connect() {
            format!("connection failed: {}", err)
        } else {
            err.to_string()
        }
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, credential: &Credential, target: &ProbeTarget) -> ProbeOutcome {
        let request = ChatRequest {
            model: &target.model,
            messages: [ChatMessage {
                role: "user",
                content: &self.config.prompt,
            }],
            max_tokens: self.config.max_tokens,
        };

        let response = match self
            .client
            .post(target.completions_url())
            .bearer_auth(credential.expose())
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                debug!(credential = %credential, error = %e, "Probe request failed");
                let status = e.status().map(|s| s.as_u16()).unwrap_or(NO_RESPONSE);
                return ProbeOutcome::failure(status, self.describe(&e));
            }
        };

        let status = response.status();
        if status.is_success() {
            trace!(credential = %credential, status = status.as_u16(), "Probe succeeded");
            return ProbeOutcome::success(status.as_u16());
        }

        let body = response.text().await.unwrap_or_default();
        let message = extract_error_message(&body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });
        debug!(credential = %credential, status = status.as_u16(), "Probe rejected: {}", message);
        ProbeOutcome::failure(status.as_u16(), message)
    }
}

/// Pull a human-readable message out of an error body.
///
/// Understands `{"error": {"message": ...}}` and `{"error": "..."}`.
pub fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let error = value.get("error")?;
    error
        .get("message")
        .and_then(|m| m.as_str())
        .or_else(|| error.as_str())
        .map(str::to_string)
}
