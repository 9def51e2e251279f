use crate::config::ClientConfig;
use crate::error::LookupError;
use crate::product::{LookupOutcome, ProductRef};
use crate::transport::HttpTransport;
use catalog_resilience::circuitbreaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitMetrics, CircuitState,
};
use catalog_resilience::retry::{Retry, RetryConfig};
use tower::{Layer, Service, ServiceExt};
use tracing::{debug, info, warn};

/// Instance name shared by the breaker and the retry middleware, naming the
/// upstream dependency they protect.
const UPSTREAM_NAME: &str = "catalog-service";

type BreakerService<S> = CircuitBreaker<S, Option<ProductRef>, LookupError>;
type LookupService<S> = Retry<BreakerService<S>, CircuitBreakerError<LookupError>>;

/// Resilient client for product lookups against the catalog service.
///
/// The lookup pipeline is retry over circuit breaker over HTTP transport.
/// The breaker sits closest to the network so every failing attempt is
/// recorded against its failure budget, and an open circuit is observed
/// before any network attempt. A 404 from the upstream flows through as a
/// successful empty response: it is a domain answer, not a failure.
///
/// Whatever error survives the pipeline, the caller never sees it: the
/// fallback logs the cause together with the product code and degrades to
/// [`LookupOutcome::NotFound`]. A degraded catalog therefore makes products
/// look absent instead of failing the surrounding order workflow.
///
/// Clones share the same circuit, so one client value (or its clones)
/// corresponds to one protected upstream dependency.
pub struct ProductServiceClient<S = HttpTransport>
where
    S: Clone,
{
    service: LookupService<S>,
    breaker: BreakerService<S>,
}

impl ProductServiceClient<HttpTransport> {
    /// Creates a client over a real HTTP transport.
    ///
    /// Fails if the configured base URL is invalid or the HTTP client
    /// cannot be constructed.
    pub fn new(config: &ClientConfig) -> Result<Self, LookupError> {
        let transport = HttpTransport::new(config)?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<S> ProductServiceClient<S>
where
    S: Service<String, Response = Option<ProductRef>, Error = LookupError>
        + Clone
        + Send
        + 'static,
    S::Future: Send + 'static,
{
    /// Creates a client over an arbitrary transport service.
    ///
    /// Used by tests to substitute the network; production code goes through
    /// [`ProductServiceClient::new`].
    pub fn with_transport(config: &ClientConfig, transport: S) -> Self {
        let breaker_layer = CircuitBreakerConfig::<Option<ProductRef>, LookupError>::builder()
            .name(UPSTREAM_NAME)
            .failure_rate_threshold(config.failure_rate_threshold)
            .sliding_window_size(config.sliding_window_size)
            .minimum_number_of_calls(config.minimum_number_of_calls)
            .wait_duration_in_open(config.wait_duration_in_open)
            .permitted_calls_in_half_open(config.permitted_calls_in_half_open)
            .build();
        let breaker = breaker_layer.layer(transport);

        let retry_layer = RetryConfig::<CircuitBreakerError<LookupError>>::builder()
            .name(UPSTREAM_NAME)
            .max_attempts(config.max_attempts)
            .exponential_backoff(config.retry_initial_backoff)
            // An open circuit is already a verdict on the upstream; only
            // transient inner failures are worth another attempt.
            .retry_on(|err: &CircuitBreakerError<LookupError>| !err.is_circuit_open())
            .build();
        // The retry middleware wraps a clone; both handles share one circuit.
        let service = retry_layer.layer(breaker.clone());

        Self { service, breaker }
    }

    /// Looks up a product by its external code.
    ///
    /// Returns [`LookupOutcome::Found`] for a healthy 2xx answer and
    /// [`LookupOutcome::NotFound`] for everything else: an upstream 404,
    /// exhausted retries, or an open circuit. Transport-level failures are
    /// logged here and never propagated.
    pub async fn get_product_by_code(&self, code: &str) -> LookupOutcome {
        info!(code, "fetching product for code");

        match self.service.clone().oneshot(code.to_owned()).await {
            Ok(Some(product)) => LookupOutcome::Found(product),
            Ok(None) => {
                debug!(code, "catalog service has no product for code");
                LookupOutcome::NotFound
            }
            Err(cause) => {
                // Fallback: degrade to an empty result rather than surface
                // an infrastructure error to the order workflow.
                warn!(code, %cause, "product lookup fell back to empty result");
                LookupOutcome::NotFound
            }
        }
    }

    /// Current state of the upstream's circuit.
    pub async fn circuit_state(&self) -> CircuitState {
        self.breaker.state().await
    }

    /// Lock-free snapshot of the circuit state for sync contexts.
    pub fn circuit_state_sync(&self) -> CircuitState {
        self.breaker.state_sync()
    }

    /// Snapshot of the circuit's window counters.
    pub async fn circuit_metrics(&self) -> CircuitMetrics {
        self.breaker.metrics().await
    }

    /// Forces the circuit open, rejecting lookups until the cooldown
    /// elapses. Intended for operational overrides and tests.
    pub async fn force_open_circuit(&self) {
        self.breaker.force_open().await;
    }

    /// Resets the circuit to closed and clears its counters.
    pub async fn reset_circuit(&self) {
        self.breaker.reset().await;
    }
}

impl<S> Clone for ProductServiceClient<S>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            breaker: self.breaker.clone(),
        }
    }
}
