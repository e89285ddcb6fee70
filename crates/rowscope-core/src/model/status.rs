use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error as ThisError;

///
/// RecordStatus
///
/// Lifecycle status of a reviewable record. Stored as upper-snake text.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[remain::sorted]
pub enum RecordStatus {
    Changed,
    Confirmed,
    InProgress,
    New,
    Viewed,
}

impl RecordStatus {
    pub const ALL: [Self; 5] = [
        Self::New,
        Self::InProgress,
        Self::Changed,
        Self::Confirmed,
        Self::Viewed,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Changed => "CHANGED",
            Self::Confirmed => "CONFIRMED",
            Self::InProgress => "IN_PROGRESS",
            Self::New => "NEW",
            Self::Viewed => "VIEWED",
        }
    }

    /// Decode a stored column value; anything but a known status text is `None`.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        value.as_text().and_then(|text| text.parse().ok())
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<RecordStatus> for Value {
    fn from(status: RecordStatus) -> Self {
        Self::text(status.as_str())
    }
}

///
/// UnknownStatus
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("unknown record status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for RecordStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}
