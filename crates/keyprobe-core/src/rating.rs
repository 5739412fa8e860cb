//! Qualitative rating of a finished stress test
//!
//! A full run fires 240 probes (one every 30 seconds for two hours); the
//! thresholds below classify how many of those went through.

use serde::{Deserialize, Serialize};

/// Highest success count still rated [`Rating::Oversold`]
pub const OVERSOLD_MAX: u64 = 30;
/// Highest success count still rated [`Rating::Suspect`]
pub const SUSPECT_MAX: u64 = 40;
/// Highest success count still rated [`Rating::Acceptable`]
pub const ACCEPTABLE_MAX: u64 = 50;

/// Rating tiers, lowest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    /// Almost certainly shared beyond capacity
    Oversold,
    /// Possibly shared beyond capacity
    Suspect,
    Acceptable,
    Strong,
}

impl Rating {
    /// Rate a terminal job by its success count
    pub fn from_success_count(success_count: u64) -> Self {
        match success_count {
            0..=OVERSOLD_MAX => Rating::Oversold,
            n if n <= SUSPECT_MAX => Rating::Suspect,
            n if n <= ACCEPTABLE_MAX => Rating::Acceptable,
            _ => Rating::Strong,
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Rating::Oversold => "definitely oversold",
            Rating::Suspect => "possibly oversold",
            Rating::Acceptable => "acceptable",
            Rating::Strong => "strong",
        }
    }
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}
