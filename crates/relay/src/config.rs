//! Relay configuration.

use std::time::Duration;

/// Default collection endpoint, matching the dev-server route the relay
/// usually ships alongside.
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:3000/api/console-logs";

/// How long a non-full batch may wait before it is flushed.
pub const DEFAULT_BATCH_INTERVAL: Duration = Duration::from_millis(2000);

/// Queued-payload count that triggers an immediate flush.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 20;

/// Display history cap; oldest entries are evicted first.
pub const DEFAULT_HISTORY_LIMIT: usize = 200;

/// Overrides the collection endpoint.
pub const ENDPOINT_ENV: &str = "RELAY_ENDPOINT";
/// Overrides the source URL reported in payloads.
pub const SOURCE_URL_ENV: &str = "RELAY_SOURCE_URL";
/// Controls the stderr output filter: a plain level like "debug", or a
/// full tracing filter spec.
pub const LOG_ENV: &str = "RELAY_LOG";

/// Settings for the capture pipeline.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Collection endpoint batches are posted to.
    pub endpoint: String,
    /// URL identifying the emitting app, included in every payload.
    pub source_url: String,
    pub batch_interval: Duration,
    pub max_batch_size: usize,
    pub history_limit: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            source_url: String::new(),
            batch_interval: DEFAULT_BATCH_INTERVAL,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl RelayConfig {
    /// Defaults with `RELAY_ENDPOINT` / `RELAY_SOURCE_URL` applied on top.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(endpoint) = std::env::var(ENDPOINT_ENV) {
            config.endpoint = endpoint;
        }
        if let Ok(source_url) = std::env::var(SOURCE_URL_ENV) {
            config.source_url = source_url;
        }
        config
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_limits() {
        let config = RelayConfig::default();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.batch_interval, Duration::from_millis(2000));
        assert_eq!(config.max_batch_size, 20);
        assert_eq!(config.history_limit, 200);
        assert!(config.source_url.is_empty());
    }
}
