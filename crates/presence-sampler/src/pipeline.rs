use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use presence_db::Database;
use presence_types::models::Observation;
use presence_types::{Status, aggregate};

use crate::probe::{ProbeClient, Target};

#[derive(Debug, Clone)]
pub struct SampleOutcome {
    pub id: i64,
    pub taken: DateTime<Utc>,
    pub elapsed: f64,
    pub status: Status,
    pub points: usize,
}

/// Resolve usernames and persist one sample with its presence points.
///
/// A username observed twice in the same sweep keeps its first observation.
pub fn save_observations(
    db: &Database,
    taken: DateTime<Utc>,
    elapsed: f64,
    observations: &[Observation],
) -> Result<SampleOutcome> {
    let mut seen = HashSet::with_capacity(observations.len());
    let unique: Vec<&Observation> = observations
        .iter()
        .filter(|obs| {
            let first = seen.insert(obs.username.as_str());
            if !first {
                warn!("Dropping repeated observation for '{}'", obs.username);
            }
            first
        })
        .collect();

    let names: Vec<&str> = unique.iter().map(|obs| obs.username.as_str()).collect();
    let ids = db.resolve_user_ids(&names)?;

    let points = unique
        .iter()
        .map(|obs| {
            ids.get(&obs.username)
                .map(|id| (*id, obs.status))
                .ok_or_else(|| anyhow!("no user id resolved for '{}'", obs.username))
        })
        .collect::<Result<Vec<_>>>()?;

    let id = db.insert_sample(taken, elapsed, &points)?;
    let status = aggregate(points.iter().map(|(_, s)| *s));

    info!("Stored sample {} ({}, {} points, {:.3}s)", id, status, points.len(), elapsed);
    Ok(SampleOutcome {
        id,
        taken,
        elapsed,
        status,
        points: points.len(),
    })
}

/// [`save_observations`] off the async runtime.
pub async fn store_sweep(
    db: Arc<Database>,
    taken: DateTime<Utc>,
    elapsed: f64,
    observations: Vec<Observation>,
) -> Result<SampleOutcome> {
    tokio::task::spawn_blocking(move || save_observations(&db, taken, elapsed, &observations))
        .await
        .map_err(|e| anyhow!("spawn_blocking join error: {}", e))?
}

/// Probe every target, time the sweep, and store the result as one sample.
pub async fn take_sample(
    db: Arc<Database>,
    client: &ProbeClient,
    targets: &[Target],
    taken: DateTime<Utc>,
) -> Result<SampleOutcome> {
    let started = Instant::now();
    let observations = client.probe_all(targets).await;
    let elapsed = started.elapsed().as_secs_f64();

    store_sweep(db, taken, elapsed, observations).await
}
