use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Status;
use crate::models::Observation;

// -- Ingestion --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IngestRequest {
    /// Seconds the external probe spent on the sweep.
    #[serde(default)]
    pub elapsed: f64,
    pub observations: Vec<Observation>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PutSampleResponse {
    pub ts: DateTime<Utc>,
    pub id: i64,
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
}

impl ErrorResponse {
    pub fn error() -> Self {
        Self {
            status: "error".to_string(),
        }
    }
}

// -- Samples --

#[derive(Debug, Serialize, Deserialize)]
pub struct SampleResponse {
    pub id: i64,
    pub taken: DateTime<Utc>,
    pub elapsed: f64,
    pub status: Status,
    pub points: Vec<PointResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PointResponse {
    pub user_id: i64,
    pub username: String,
    pub status: Status,
}
