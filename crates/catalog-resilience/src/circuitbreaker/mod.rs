//! Circuit breaker middleware for tower services.
//!
//! The breaker tracks the outcome of calls to a dependency in a rolling
//! window and stops calling it once the failure rate exceeds a threshold:
//!
//! - **Closed**: normal operation, calls pass through.
//! - **Open**: calls are rejected immediately with
//!   [`CircuitBreakerError::OpenCircuit`], without touching the network.
//! - **HalfOpen**: after a cooldown, a limited number of trial calls probe
//!   recovery. A successful trial closes the circuit; a failed one reopens
//!   it and restarts the cooldown.
//!
//! The circuit itself is shared state: cloning a [`CircuitBreaker`] yields a
//! handle to the same circuit, so all concurrent callers of one upstream
//! dependency observe and update the same counters.

use futures::future::BoxFuture;
use std::sync::atomic::AtomicU8;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::Mutex;
use tower::Service;

pub use circuit::{CircuitMetrics, CircuitState};
pub use config::{
    CircuitBreakerConfig, CircuitBreakerConfigBuilder, SharedFailureClassifier,
};
pub use error::CircuitBreakerError;
pub use events::CircuitBreakerEvent;
pub use layer::CircuitBreakerLayer;

use circuit::Circuit;

mod circuit;
mod config;
mod error;
mod events;
mod layer;

/// A tower service applying circuit breaker logic to an inner service.
///
/// `Res` and `Err` are the response and error types of the inner service;
/// they appear as type parameters so the failure classifier can inspect the
/// call result.
pub struct CircuitBreaker<S, Res, Err> {
    inner: S,
    circuit: Arc<Mutex<Circuit>>,
    state_atomic: Arc<AtomicU8>,
    config: Arc<CircuitBreakerConfig<Res, Err>>,
}

impl<S, Res, Err> CircuitBreaker<S, Res, Err> {
    pub(crate) fn new(inner: S, config: Arc<CircuitBreakerConfig<Res, Err>>) -> Self {
        let state_atomic = Arc::new(AtomicU8::new(CircuitState::Closed as u8));
        Self {
            inner,
            circuit: Arc::new(Mutex::new(Circuit::new_with_atomic(Arc::clone(
                &state_atomic,
            )))),
            state_atomic,
            config,
        }
    }

    /// Forces the circuit into the open state.
    pub async fn force_open(&self) {
        let mut circuit = self.circuit.lock().await;
        circuit.force_open(&self.config);
    }

    /// Forces the circuit into the closed state.
    pub async fn force_closed(&self) {
        let mut circuit = self.circuit.lock().await;
        circuit.force_closed(&self.config);
    }

    /// Resets the circuit to closed and clears the window counters.
    pub async fn reset(&self) {
        let mut circuit = self.circuit.lock().await;
        circuit.reset(&self.config);
    }

    /// Returns the current state of the circuit.
    pub async fn state(&self) -> CircuitState {
        let circuit = self.circuit.lock().await;
        circuit.state()
    }

    /// Returns the current state without requiring async context.
    ///
    /// Reads an atomic mirror of the state, safe to call from sync code
    /// such as health checks.
    pub fn state_sync(&self) -> CircuitState {
        CircuitState::from_u8(self.state_atomic.load(std::sync::atomic::Ordering::Acquire))
    }

    /// Returns whether the circuit is currently open.
    pub fn is_open(&self) -> bool {
        self.state_sync() == CircuitState::Open
    }

    /// Returns a snapshot of the circuit's counters.
    pub async fn metrics(&self) -> CircuitMetrics {
        let circuit = self.circuit.lock().await;
        circuit.metrics(&self.config)
    }
}

impl<S, Res, Err> Clone for CircuitBreaker<S, Res, Err>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            circuit: Arc::clone(&self.circuit),
            state_atomic: Arc::clone(&self.state_atomic),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S, Req, Res, Err> Service<Req> for CircuitBreaker<S, Res, Err>
where
    S: Service<Req, Response = Res, Error = Err> + Clone + Send + 'static,
    S::Future: Send + 'static,
    Req: Send + 'static,
    Res: Send + 'static,
    Err: Send + 'static,
{
    type Response = Res;
    type Error = CircuitBreakerError<Err>;
    type Future = BoxFuture<'static, Result<Res, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner
            .poll_ready(cx)
            .map_err(CircuitBreakerError::Inner)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let config = Arc::clone(&self.config);
        let circuit = Arc::clone(&self.circuit);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let permitted = {
                let mut circuit = circuit.lock().await;
                circuit.try_acquire(&config)
            };

            if !permitted {
                #[cfg(feature = "tracing")]
                tracing::debug!(breaker = %config.name, "call rejected, circuit open");

                return Err(CircuitBreakerError::OpenCircuit);
            }

            let result = inner.call(req).await;

            let mut circuit = circuit.lock().await;
            if (config.failure_classifier)(&result) {
                circuit.record_failure(&config);
            } else {
                circuit.record_success(&config);
            }

            result.map_err(CircuitBreakerError::Inner)
        })
    }
}
