use std::sync::Arc;

use chrono::{DateTime, Utc};

use presence_db::Database;
use presence_sampler::{ProbeClient, Target};

pub type AppState = Arc<AppStateInner>;

/// Process-wide context, built once at startup and shared by every request.
pub struct AppStateInner {
    pub db: Arc<Database>,
    pub api_key: String,
    pub probe: ProbeClient,
    /// Targets probed by `GET /putsample/{apikey}`.
    pub targets: Vec<Target>,
    pub started_at: DateTime<Utc>,
}
