//! Configuration for the sync engine.

use std::time::Duration;

/// Default API base path.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3001/api/v1";

/// Configuration for sync operations.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Base URL of the expenses API, including the version prefix.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Page size used by the pull phase.
    pub pull_page_size: u32,
    /// Retry configuration.
    pub retry: RetryConfig,
    /// Delay before the sync that follows a reconnect.
    pub reconnect_debounce: Duration,
    /// Delay before the sync that follows a local mutation.
    pub post_mutation_delay: Duration,
}

impl SyncConfig {
    /// Creates a configuration for the API at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(30),
            pull_page_size: 100,
            retry: RetryConfig::default(),
            reconnect_debounce: Duration::from_secs(5),
            post_mutation_delay: Duration::from_secs(1),
        }
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the pull page size.
    pub fn with_pull_page_size(mut self, size: u32) -> Self {
        self.pull_page_size = size.max(1);
        self
    }

    /// Sets the retry configuration.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the reconnect debounce.
    pub fn with_reconnect_debounce(mut self, delay: Duration) -> Self {
        self.reconnect_debounce = delay;
        self
    }

    /// Sets the post-mutation sync delay.
    pub fn with_post_mutation_delay(mut self, delay: Duration) -> Self {
        self.post_mutation_delay = delay;
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Failed attempts after which a mutation is evicted.
    pub max_attempts: u32,
    /// Delay unit; the delay after `n` failures is `base_delay * 2^n`.
    pub base_delay: Duration,
    /// Upper bound on a single delay.
    pub max_delay: Duration,
}

impl RetryConfig {
    /// Creates a configuration with `max_attempts` and the default delays.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(30_000),
        }
    }

    /// Sets the base delay.
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Sets the maximum delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Delay before retrying an item that has failed `attempts` times:
    /// `min(base * 2^attempts, max)`.
    pub fn delay_for_attempt(&self, attempts: u32) -> Duration {
        let factor = 2u32.checked_pow(attempts).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    /// Returns true once `attempts` failures exhaust the budget.
    pub fn is_exhausted(&self, attempts: u32) -> bool {
        attempts >= self.max_attempts
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_config_builder() {
        let config = SyncConfig::new("https://api.example.com/api/v1")
            .with_pull_page_size(0)
            .with_timeout(Duration::from_secs(60))
            .with_reconnect_debounce(Duration::from_millis(10));

        assert_eq!(config.base_url, "https://api.example.com/api/v1");
        assert_eq!(config.pull_page_size, 1);
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.reconnect_debounce, Duration::from_millis(10));
        assert_eq!(config.post_mutation_delay, Duration::from_secs(1));
    }

    #[test]
    fn default_points_at_local_api() {
        let config = SyncConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.reconnect_debounce, Duration::from_secs(5));
    }

    #[test]
    fn retry_delay_doubles_per_attempt() {
        let config = RetryConfig::default();
        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(1000));
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(2000));
        assert_eq!(config.delay_for_attempt(4), Duration::from_millis(16_000));
    }

    #[test]
    fn retry_delay_respects_max() {
        let config = RetryConfig::default();
        assert_eq!(config.delay_for_attempt(5), Duration::from_millis(30_000));
        assert_eq!(config.delay_for_attempt(40), Duration::from_millis(30_000));
    }

    #[test]
    fn exhaustion_at_max_attempts() {
        let config = RetryConfig::default();
        assert!(!config.is_exhausted(4));
        assert!(config.is_exhausted(5));
    }
}
