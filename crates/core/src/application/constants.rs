// Retrieval constants (no magic values)
use std::time::Duration;

/// Minimum time between the starts of two retrieval rounds (10s)
pub const DEFAULT_THROTTLE_WINDOW: Duration = Duration::from_secs(10);

/// Maximum number of not-yet-cached identifiers one batch worker dispatches
pub const DEFAULT_BATCH_CAPACITY: usize = 10;

/// Worker pairs (one cell + one Wi-Fi worker) spawned per round
pub const DEFAULT_WORKER_PAIRS: usize = 1;

/// Environment variable names read by `RetrieverConfig::from_env`
pub const ENV_THROTTLE_WINDOW_MS: &str = "NETLOC_THROTTLE_WINDOW_MS";
pub const ENV_BATCH_CAPACITY: &str = "NETLOC_BATCH_CAPACITY";
pub const ENV_WORKER_PAIRS: &str = "NETLOC_WORKER_PAIRS";
pub const ENV_IN_FLIGHT_POLICY: &str = "NETLOC_IN_FLIGHT_POLICY";
