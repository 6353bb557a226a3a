//! Engine configuration: deployment-tunable knobs with environment
//! overrides (`CAPSCOPE_*`).

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Override for the provider table's default base URL
    /// (self-hosted instances).
    pub base_url: Option<String>,
    /// Profile time-to-live.
    pub cache_ttl_secs: u64,
    /// Per-probe HTTP timeout.
    pub probe_timeout_ms: u64,
    /// Deadline for one whole discovery pass; probes still in flight
    /// when it elapses are recorded as inconclusive.
    pub aggregate_timeout_ms: u64,
    /// Backoff before the single 5xx/transport retry.
    pub retry_backoff_ms: u64,
    /// Worker-pool bound, kept small to stay under provider rate limits.
    pub max_concurrent_probes: usize,
    /// Cap on instances mapped per resource type.
    pub max_resources_mapped: usize,
    /// Serve the previous stale profile while a refresh pass is in
    /// flight instead of waiting for it to publish.
    pub serve_stale_while_refreshing: bool,
    /// With no profile available at all, allow read operations
    /// (mutating operations always fail closed in that state).
    pub fail_open_reads: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            cache_ttl_secs: 900,
            probe_timeout_ms: 10_000,
            aggregate_timeout_ms: 60_000,
            retry_backoff_ms: 250,
            max_concurrent_probes: 4,
            max_resources_mapped: 25,
            serve_stale_while_refreshing: false,
            fail_open_reads: true,
        }
    }
}

impl DiscoveryConfig {
    /// Defaults with `CAPSCOPE_*` environment overrides applied.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("CAPSCOPE_BASE_URL").ok().filter(|s| !s.is_empty()),
            cache_ttl_secs: env_parse("CAPSCOPE_CACHE_TTL_SECS", defaults.cache_ttl_secs),
            probe_timeout_ms: env_parse("CAPSCOPE_PROBE_TIMEOUT_MS", defaults.probe_timeout_ms),
            aggregate_timeout_ms: env_parse(
                "CAPSCOPE_AGGREGATE_TIMEOUT_MS",
                defaults.aggregate_timeout_ms,
            ),
            retry_backoff_ms: env_parse("CAPSCOPE_RETRY_BACKOFF_MS", defaults.retry_backoff_ms),
            max_concurrent_probes: env_parse(
                "CAPSCOPE_MAX_CONCURRENT_PROBES",
                defaults.max_concurrent_probes,
            ),
            max_resources_mapped: env_parse(
                "CAPSCOPE_MAX_RESOURCES_MAPPED",
                defaults.max_resources_mapped,
            ),
            serve_stale_while_refreshing: env_parse(
                "CAPSCOPE_SERVE_STALE",
                defaults.serve_stale_while_refreshing,
            ),
            fail_open_reads: env_parse("CAPSCOPE_FAIL_OPEN_READS", defaults.fail_open_reads),
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn aggregate_timeout(&self) -> Duration {
        Duration::from_millis(self.aggregate_timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

fn env_parse<T: FromStr + Copy>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                warn!(key, raw, "ignoring unparsable environment override");
                default
            }
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_minutes_scale() {
        let config = DiscoveryConfig::default();
        assert_eq!(config.cache_ttl(), Duration::from_secs(900));
        assert!(config.max_concurrent_probes >= 1);
        assert!(config.fail_open_reads);
        assert!(!config.serve_stale_while_refreshing);
    }

    #[test]
    fn serde_round_trip_with_partial_input() {
        let config: DiscoveryConfig =
            serde_json::from_str(r#"{"cache_ttl_secs": 60, "serve_stale_while_refreshing": true}"#)
                .unwrap();
        assert_eq!(config.cache_ttl_secs, 60);
        assert!(config.serve_stale_while_refreshing);
        // Unspecified fields keep their defaults.
        assert_eq!(config.probe_timeout_ms, 10_000);
    }
}
