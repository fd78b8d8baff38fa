// Retriever configuration

use super::constants::*;
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// What happens to workers of an in-flight round when the scheduler stops
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InFlightPolicy {
    /// Workers keep running in the background and commit their batches
    #[default]
    Detach,
    /// Workers are aborted at their next suspension point
    Abort,
}

impl FromStr for InFlightPolicy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "detach" => Ok(InFlightPolicy::Detach),
            "abort" => Ok(InFlightPolicy::Abort),
            other => Err(AppError::Config(format!(
                "unknown in-flight policy '{}' (expected detach or abort)",
                other
            ))),
        }
    }
}

/// Retrieval engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrieverConfig {
    pub throttle_window: Duration,
    pub batch_capacity: usize,
    pub worker_pairs: usize,
    pub in_flight_policy: InFlightPolicy,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            throttle_window: DEFAULT_THROTTLE_WINDOW,
            batch_capacity: DEFAULT_BATCH_CAPACITY,
            worker_pairs: DEFAULT_WORKER_PAIRS,
            in_flight_policy: InFlightPolicy::default(),
        }
    }
}

impl RetrieverConfig {
    pub fn with_throttle_window(mut self, window: Duration) -> Self {
        self.throttle_window = window;
        self
    }

    pub fn with_batch_capacity(mut self, capacity: usize) -> Self {
        self.batch_capacity = capacity;
        self
    }

    pub fn with_worker_pairs(mut self, pairs: usize) -> Self {
        self.worker_pairs = pairs;
        self
    }

    pub fn with_in_flight_policy(mut self, policy: InFlightPolicy) -> Self {
        self.in_flight_policy = policy;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_capacity == 0 {
            return Err(AppError::Config("batch_capacity must be at least 1".into()));
        }
        if self.worker_pairs == 0 {
            return Err(AppError::Config("worker_pairs must be at least 1".into()));
        }
        Ok(())
    }

    /// Load configuration from `NETLOC_*` environment variables
    ///
    /// Unset variables keep their defaults; malformed values are errors.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(ms) = lookup(ENV_THROTTLE_WINDOW_MS) {
            config.throttle_window = Duration::from_millis(parse_var(ENV_THROTTLE_WINDOW_MS, &ms)?);
        }
        if let Some(capacity) = lookup(ENV_BATCH_CAPACITY) {
            config.batch_capacity = parse_var(ENV_BATCH_CAPACITY, &capacity)?;
        }
        if let Some(pairs) = lookup(ENV_WORKER_PAIRS) {
            config.worker_pairs = parse_var(ENV_WORKER_PAIRS, &pairs)?;
        }
        if let Some(policy) = lookup(ENV_IN_FLIGHT_POLICY) {
            config.in_flight_policy = policy.parse()?;
        }

        config.validate()?;
        Ok(config)
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::Config(format!("{}: invalid value '{}'", key, value)))
}
