// Core registry types shared by the API surface and its clients.

use std::{fmt, str::FromStr};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Permission carried by an access grant. No other value is ever persisted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    Write,
    Delegate,
    Creator,
}

impl Permission {
    pub const ALL: [Permission; 3] = [Self::Write, Self::Delegate, Self::Creator];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Write => "write",
            Self::Delegate => "delegate",
            Self::Creator => "creator",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("permission must be one of: write, delegate, creator (got `{0}`)")]
pub struct InvalidPermission(pub String);

impl FromStr for Permission {
    type Err = InvalidPermission;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|permission| permission.as_str() == value)
            .ok_or_else(|| InvalidPermission(value.to_owned()))
    }
}

impl TryFrom<String> for Permission {
    type Error = InvalidPermission;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Requested revision of a document.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DocumentVersion {
    #[default]
    Latest,
    Deprecated,
}

/// Provenance triple attached to documents and events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Timestamp {
    pub datetime: String,
    pub source: String,
    pub proof: String,
}

impl Timestamp {
    /// Builds the wire triple, or `None` unless all three parts are present.
    pub fn from_parts(
        datetime: Option<DateTime<Utc>>,
        source: Option<String>,
        proof: Option<String>,
    ) -> Option<Self> {
        match (datetime, source, proof) {
            (Some(datetime), Some(source), Some(proof)) => Some(Self {
                datetime: datetime.to_rfc3339_opts(SecondsFormat::Secs, true),
                source,
                proof,
            }),
            _ => None,
        }
    }
}

/// Navigation links of a paginated listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageLinks {
    pub first: String,
    pub prev: String,
    pub next: String,
    pub last: String,
}
