//! Resilience middleware for tower services.
//!
//! This crate provides the protective machinery used when calling a remote
//! dependency that may fail or degrade:
//!
//! - [`circuitbreaker`]: a circuit breaker `Service`/`Layer` pair that stops
//!   calling a persistently failing dependency for a cooldown period.
//! - [`retry`]: a retry `Service`/`Layer` pair with pluggable backoff
//!   strategies and retry predicates.
//! - [`events`]: a listener-based event system shared by both patterns.
//!
//! Both patterns are explicit wrapper objects: a configuration struct built
//! through a builder, applied imperatively around an inner service via
//! `tower::Layer`. There is no ambient or global state; a circuit is owned by
//! the `CircuitBreaker` service that wraps the dependency, and clones of that
//! service share the same circuit.
//!
//! ## Example
//!
//! ```rust
//! use catalog_resilience::circuitbreaker::{CircuitBreakerConfig, CircuitBreakerError};
//! use catalog_resilience::retry::RetryConfig;
//! use std::time::Duration;
//! use tower::Layer;
//!
//! # async fn example() {
//! let breaker = CircuitBreakerConfig::<String, std::io::Error>::builder()
//!     .failure_rate_threshold(0.5)
//!     .sliding_window_size(10)
//!     .wait_duration_in_open(Duration::from_secs(30))
//!     .name("upstream")
//!     .build();
//!
//! let retry = RetryConfig::<CircuitBreakerError<std::io::Error>>::builder()
//!     .max_attempts(3)
//!     .exponential_backoff(Duration::from_millis(100))
//!     .build();
//!
//! let svc = tower::service_fn(|req: String| async move {
//!     Ok::<String, std::io::Error>(req)
//! });
//!
//! // Breaker sits closest to the dependency so every attempt is recorded.
//! let service = retry.layer(breaker.layer(svc));
//! # let _ = service;
//! # }
//! ```

pub mod circuitbreaker;
pub mod events;
pub mod retry;

pub use events::{EventListener, EventListeners, FnListener, ResilienceEvent};
