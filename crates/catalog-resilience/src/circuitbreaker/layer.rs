use crate::circuitbreaker::config::CircuitBreakerConfig;
use crate::circuitbreaker::CircuitBreaker;
use std::sync::Arc;
use tower::Layer;

/// A tower [`Layer`] that wraps a service in a [`CircuitBreaker`].
///
/// `Res` and `Err` are the response and error types of the wrapped service.
/// Every clone of the produced service shares the same circuit, so one layer
/// instance corresponds to one protected upstream dependency.
///
/// ```rust
/// use catalog_resilience::circuitbreaker::CircuitBreakerConfig;
/// use tower::{Layer, service_fn};
///
/// let layer = CircuitBreakerConfig::<String, std::io::Error>::builder()
///     .failure_rate_threshold(0.5)
///     .sliding_window_size(10)
///     .name("upstream")
///     .build();
///
/// let service = layer.layer(service_fn(|req: String| async move {
///     Ok::<_, std::io::Error>(req)
/// }));
/// # let _ = service;
/// ```
pub struct CircuitBreakerLayer<Res, Err> {
    config: Arc<CircuitBreakerConfig<Res, Err>>,
}

impl<Res, Err> CircuitBreakerLayer<Res, Err> {
    pub(crate) fn new(config: CircuitBreakerConfig<Res, Err>) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Creates a new builder for configuring a circuit breaker layer.
    pub fn builder() -> crate::circuitbreaker::CircuitBreakerConfigBuilder<Res, Err> {
        crate::circuitbreaker::CircuitBreakerConfigBuilder::new()
    }
}

impl<Res, Err> Clone for CircuitBreakerLayer<Res, Err> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
        }
    }
}

impl<S, Res, Err> Layer<S> for CircuitBreakerLayer<Res, Err> {
    type Service = CircuitBreaker<S, Res, Err>;

    fn layer(&self, service: S) -> Self::Service {
        CircuitBreaker::new(service, Arc::clone(&self.config))
    }
}
