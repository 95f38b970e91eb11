use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Status;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub added: DateTime<Utc>,
    pub displayname: Option<String>,
    pub flag: Option<String>,
}

/// One timestamped sweep over many users.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sample {
    pub id: i64,
    pub taken: DateTime<Utc>,
    /// Seconds spent probing.
    pub elapsed: f64,
    pub status: Status,
}

/// One user's status within a sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresencePoint {
    pub sample_id: i64,
    pub user_id: i64,
    pub status: Status,
}

/// A normalized (username, status) pair produced by a probe or pushed by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub username: String,
    pub status: Status,
}

impl Observation {
    pub fn new(username: impl Into<String>, status: Status) -> Self {
        Self {
            username: username.into(),
            status,
        }
    }
}
