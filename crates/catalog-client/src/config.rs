use std::time::Duration;

/// Configuration surface of the catalog client.
///
/// All values are supplied by the embedding application; the defaults mirror
/// the upstream service's documented timeouts (5 seconds connect and read)
/// and a 3-attempt retry budget.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the catalog service, e.g. `http://localhost:8081`.
    pub base_url: String,
    /// TCP connect timeout for each attempt.
    pub connect_timeout: Duration,
    /// Total per-attempt timeout covering response read.
    pub read_timeout: Duration,
    /// Maximum total attempts per lookup, including the initial one.
    pub max_attempts: usize,
    /// Initial interval of the exponential retry backoff.
    pub retry_initial_backoff: Duration,
    /// Failure rate (0.0 to 1.0) at which the circuit opens.
    pub failure_rate_threshold: f64,
    /// Number of calls in the circuit's rolling window.
    pub sliding_window_size: usize,
    /// Minimum recorded calls before the failure rate is evaluated.
    pub minimum_number_of_calls: usize,
    /// Cooldown the circuit spends open before allowing trial calls.
    pub wait_duration_in_open: Duration,
    /// Trial calls permitted in the half-open state.
    pub permitted_calls_in_half_open: usize,
}

impl ClientConfig {
    /// Creates a builder with defaults for the given base URL.
    pub fn builder<S: Into<String>>(base_url: S) -> ClientConfigBuilder {
        ClientConfigBuilder::new(base_url)
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug, Clone)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    fn new<S: Into<String>>(base_url: S) -> Self {
        Self {
            config: ClientConfig {
                base_url: base_url.into(),
                connect_timeout: Duration::from_secs(5),
                read_timeout: Duration::from_secs(5),
                max_attempts: 3,
                retry_initial_backoff: Duration::from_millis(100),
                failure_rate_threshold: 0.5,
                sliding_window_size: 10,
                minimum_number_of_calls: 10,
                wait_duration_in_open: Duration::from_secs(30),
                permitted_calls_in_half_open: 1,
            },
        }
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = timeout;
        self
    }

    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.config.max_attempts = attempts;
        self
    }

    pub fn retry_initial_backoff(mut self, backoff: Duration) -> Self {
        self.config.retry_initial_backoff = backoff;
        self
    }

    pub fn failure_rate_threshold(mut self, rate: f64) -> Self {
        self.config.failure_rate_threshold = rate;
        self
    }

    pub fn sliding_window_size(mut self, size: usize) -> Self {
        self.config.sliding_window_size = size;
        self
    }

    pub fn minimum_number_of_calls(mut self, calls: usize) -> Self {
        self.config.minimum_number_of_calls = calls;
        self
    }

    pub fn wait_duration_in_open(mut self, duration: Duration) -> Self {
        self.config.wait_duration_in_open = duration;
        self
    }

    pub fn permitted_calls_in_half_open(mut self, calls: usize) -> Self {
        self.config.permitted_calls_in_half_open = calls;
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_upstream_contract() {
        let config = ClientConfig::builder("http://localhost:8081").build();
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.read_timeout, Duration::from_secs(5));
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.failure_rate_threshold, 0.5);
        assert_eq!(config.permitted_calls_in_half_open, 1);
    }

    #[test]
    fn builder_overrides() {
        let config = ClientConfig::builder("http://catalog:8081")
            .max_attempts(5)
            .read_timeout(Duration::from_secs(2))
            .sliding_window_size(20)
            .build();
        assert_eq!(config.base_url, "http://catalog:8081");
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.read_timeout, Duration::from_secs(2));
        assert_eq!(config.sliding_window_size, 20);
    }
}
