//! Configuration types for keyprobe
//!
//! Stress-test timing (tick interval, duration ceiling, retention) is fixed
//! and lives in [`crate::stress`]; only I/O facing settings are configurable.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default timeout for a single probe request
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Response length cap sent with every probe
pub const DEFAULT_MAX_TOKENS: u32 = 10;

/// Prompt sent with every probe
pub const DEFAULT_PROMPT: &str = "Hello, please respond with 'OK' if you can see this message.";

/// Default chat-completion base URL
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";

/// Default model name
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Main service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeyprobeConfig {
    /// Probe settings
    #[serde(default)]
    pub probe: ProbeConfig,
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,
}

/// Settings for the outbound probe request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Request timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// `max_tokens` sent with the request
    pub max_tokens: u32,
    /// User message sent with the request
    pub prompt: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_PROBE_TIMEOUT,
            max_tokens: DEFAULT_MAX_TOKENS,
            prompt: DEFAULT_PROMPT.to_string(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind host
    pub host: String,
    /// Bind port
    pub port: u16,
    /// Endpoint used when a request omits one
    pub default_endpoint: String,
    /// Model used when a request omits one
    pub default_model: String,
    /// Announcement banner text file
    pub announcement_file: PathBuf,
    /// Directory with the static UI (None = not served)
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            default_endpoint: DEFAULT_ENDPOINT.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            announcement_file: PathBuf::from("announcement.txt"),
            static_dir: None,
        }
    }
}

impl ServerConfig {
    /// Socket address string to bind
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// Helper module for Duration serialization
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s = humantime::format_duration(*duration).to_string();
        s.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
