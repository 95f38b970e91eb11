//! Probe fan-out and the sampling pipeline.
//!
//! A sweep runs in three steps: [`probe::ProbeClient::probe_all`] asks the
//! probe endpoint about every target concurrently, [`result::process_result`]
//! turns each reply into an [`Observation`](presence_types::models::Observation),
//! and [`pipeline`] resolves usernames and stores the sample atomically.

pub mod pipeline;
pub mod probe;
pub mod result;

pub use pipeline::{SampleOutcome, save_observations, store_sweep, take_sample};
pub use probe::{ProbeClient, ProbeConfig, ProbeError, Target};
pub use result::{ResultProcessor, process_result};
