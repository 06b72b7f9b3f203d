//! Domain types shared by the transformer, the sync engine and the CLI.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// The identity of a document: a path-derived title locally, the native page
/// title remotely. The sole key correlating the two sides.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Title(pub String);

impl Title {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Title {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for Title {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Title {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// A remote page or block identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageId(pub String);

impl PageId {
    /// Parse a user-supplied root identifier.
    ///
    /// Accepts a bare 32-hex id, a dashed UUID, or a page URL / slug whose
    /// last path segment ends in `-<32-hex-id>`. Query string and fragment
    /// are ignored.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let malformed = || ConfigError::MalformedRootId {
            value: raw.to_string(),
        };

        let without_query = raw.trim().split(['?', '#']).next().unwrap_or("");
        let segment = without_query
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or("");

        if is_dashed_uuid(segment) {
            return Ok(Self(segment.to_ascii_lowercase()));
        }

        let candidate = segment.rsplit('-').next().unwrap_or("");
        if is_hex_id(candidate) {
            Ok(Self(candidate.to_ascii_lowercase()))
        } else {
            Err(malformed())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for PageId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for PageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

fn is_hex_id(s: &str) -> bool {
    s.len() == 32 && s.chars().all(|c| c.is_ascii_hexdigit())
}

fn is_dashed_uuid(s: &str) -> bool {
    s.len() == 36
        && s.char_indices().all(|(i, c)| match i {
            8 | 13 | 18 | 23 => c == '-',
            _ => c.is_ascii_hexdigit(),
        })
}

/// Remote API credential. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiToken(String);

impl ApiToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiToken(***)")
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// How a per-item mutation failure is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Log the failure and continue with the next item.
    #[default]
    Ignore,
    /// Abort the whole run on the first failure.
    Strict,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::Ignore => write!(f, "ignore"),
            FailurePolicy::Strict => write!(f, "strict"),
        }
    }
}

impl FromStr for FailurePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ignore" => Ok(Self::Ignore),
            "strict" => Ok(Self::Strict),
            other => Err(ConfigError::InvalidPolicy {
                value: other.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
