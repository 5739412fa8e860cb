//! Credential type
//!
//! A credential is the bearer token under test. It serializes as the raw
//! token so results can be handed back to the submitter, but its `Debug` and
//! `Display` output is always a masked fingerprint, which keeps tokens out of
//! logs.

use serde::{Deserialize, Serialize};

/// Tokens shorter than this are masked completely
const MIN_REVEAL_LEN: usize = 12;

/// Characters revealed at each end of a masked token
const REVEAL_CHARS: usize = 4;

/// An opaque API token under test
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    /// Wrap a raw token
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for building the `Authorization` header
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Whether the token is empty or whitespace only
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Masked form, e.g. `sk-a…wxyz`
    pub fn masked(&self) -> String {
        let count = self.0.chars().count();
        if count < MIN_REVEAL_LEN {
            return "***".to_string();
        }
        let head: String = self.0.chars().take(REVEAL_CHARS).collect();
        let tail: String = self.0.chars().skip(count - REVEAL_CHARS).collect();
        format!("{}…{}", head, tail)
    }
}

impl std::fmt::Display for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.masked())
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Credential({})", self.masked())
    }
}

impl From<&str> for Credential {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

impl From<String> for Credential {
    fn from(token: String) -> Self {
        Self(token)
    }
}

/// Drop blank entries, keeping the order of the rest
pub fn non_blank(credentials: impl IntoIterator<Item = Credential>) -> Vec<Credential> {
    credentials.into_iter().filter(|c| !c.is_blank()).collect()
}
