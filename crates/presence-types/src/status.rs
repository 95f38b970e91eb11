use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Presence status for one user in a sample, or the aggregate of a whole sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Warning,
    Error,
}

#[derive(Debug, Error)]
#[error("unknown status: {0:?}")]
pub struct UnknownStatus(pub String);

impl Status {
    /// Single-character code used in the `status` columns.
    pub fn code(self) -> &'static str {
        match self {
            Self::Success => "s",
            Self::Warning => "w",
            Self::Error => "e",
        }
    }

    pub fn from_code(code: &str) -> Result<Self, UnknownStatus> {
        match code {
            "s" => Ok(Self::Success),
            "w" => Ok(Self::Warning),
            "e" => Ok(Self::Error),
            other => Err(UnknownStatus(other.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Self::Success),
            "warning" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Reduce the per-user statuses of one sweep to a single sample status.
///
/// `Success` only when every observation succeeded. Any success or warning
/// otherwise degrades to `Warning`. Everything else, including an empty sweep
/// (nothing was observed online), is `Error`.
pub fn aggregate<I>(statuses: I) -> Status
where
    I: IntoIterator<Item = Status>,
{
    let mut seen_success = false;
    let mut seen_warning = false;
    let mut seen_error = false;

    for status in statuses {
        match status {
            Status::Success => seen_success = true,
            Status::Warning => seen_warning = true,
            Status::Error => seen_error = true,
        }
    }

    match (seen_success, seen_warning, seen_error) {
        (true, false, false) => Status::Success,
        (true, _, _) | (_, true, _) => Status::Warning,
        _ => Status::Error,
    }
}
