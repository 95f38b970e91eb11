use std::time::Duration;

use futures_util::future::join_all;
use reqwest::Client;
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, warn};

use presence_types::Status;
use presence_types::models::Observation;

use crate::result::{ResultProcessor, process_result};

/// Pause between attempts, multiplied by the attempt number.
const RETRY_BACKOFF: Duration = Duration::from_millis(200);

/// One thing to probe. `group` names the user the reply is attributed to
/// unless the reply says otherwise; `spec` is forwarded to the probe verbatim.
#[derive(Debug, Clone, Serialize)]
pub struct Target {
    pub group: String,
    pub spec: Value,
}

impl Target {
    /// A target that asks the probe about a single username.
    pub fn for_user(username: impl Into<String>) -> Self {
        let group = username.into();
        let spec = json!({ "user": group });
        Self { group, spec }
    }
}

#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub url: String,
    pub timeout: Duration,
    /// Extra attempts after a transport error or 5xx reply.
    pub retries: u32,
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("probe answered with HTTP {0}")]
    Status(u16),
    #[error("malformed payload: {0}")]
    Payload(String),
}

impl ProbeError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status(code) => *code >= 500,
            Self::Payload(_) => false,
        }
    }
}

/// Issues probe requests over one shared HTTP connection pool.
///
/// The pool lives as long as the client; a batch borrows it for its whole
/// duration, so no request can outlive the session it runs on.
#[derive(Clone)]
pub struct ProbeClient {
    http: Client,
    config: ProbeConfig,
    processor: ResultProcessor,
}

impl ProbeClient {
    /// A client that maps replies with [`process_result`].
    pub fn new(config: ProbeConfig) -> Result<Self, ProbeError> {
        Self::with_processor(config, process_result)
    }

    /// A client that maps each successful reply with `processor`.
    pub fn with_processor(config: ProbeConfig, processor: ResultProcessor) -> Result<Self, ProbeError> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            config,
            processor,
        })
    }

    /// Probe every target concurrently and return one observation per target,
    /// in target order. A failed probe becomes an `error` observation for its
    /// group; it never cancels the others.
    pub async fn probe_all(&self, targets: &[Target]) -> Vec<Observation> {
        let probes = targets.iter().map(|target| async move {
            match self.probe(target).await {
                Ok(observation) => observation,
                Err(e) => {
                    warn!("Probe for '{}' failed: {}", target.group, e);
                    Observation::new(target.group.clone(), Status::Error)
                }
            }
        });

        join_all(probes).await
    }

    /// Probe a single target, retrying transient failures.
    pub async fn probe(&self, target: &Target) -> Result<Observation, ProbeError> {
        let mut attempt = 0;
        loop {
            match self.fetch(target).await {
                Ok(payload) => return (self.processor)(&target.group, payload),
                Err(e) if e.is_retryable() && attempt < self.config.retries => {
                    attempt += 1;
                    debug!("Retrying probe for '{}' ({}/{}): {}", target.group, attempt, self.config.retries, e);
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch(&self, target: &Target) -> Result<Value, ProbeError> {
        let resp = self
            .http
            .post(&self.config.url)
            .json(target)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ProbeError::Status(status.as_u16()));
        }

        let body = resp.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| ProbeError::Payload(e.to_string()))
    }
}
