//! Retry middleware for tower services.
//!
//! Failed calls are repeated up to a configured attempt budget, waiting
//! between attempts according to a pluggable [`IntervalFunction`]. A retry
//! predicate restricts which errors are worth repeating: a definitive domain
//! answer should not be retried, only failures that are plausibly transient.

use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::Service;

pub use backoff::{
    ExponentialBackoff, ExponentialRandomBackoff, FixedInterval, FnInterval, IntervalFunction,
};
pub use config::{RetryConfig, RetryConfigBuilder};
pub use events::RetryEvent;
pub use layer::RetryLayer;
pub use policy::{RetryPolicy, RetryPredicate};

use events::RetryEvent as Event;

mod backoff;
mod config;
mod events;
mod layer;
mod policy;

/// A tower service that retries failed requests.
pub struct Retry<S, E> {
    inner: S,
    config: Arc<RetryConfig<E>>,
}

impl<S, E> Retry<S, E> {
    pub(crate) fn new(inner: S, config: Arc<RetryConfig<E>>) -> Self {
        Self { inner, config }
    }
}

impl<S, E> Clone for Retry<S, E>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S, Req, E> Service<Req> for Retry<S, E>
where
    S: Service<Req, Error = E> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
    Req: Clone + Send + 'static,
    E: Send + 'static,
{
    type Response = S::Response;
    type Error = E;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let mut service = self.inner.clone();
        let config = Arc::clone(&self.config);

        Box::pin(async move {
            let mut attempt = 0;

            loop {
                let result = service.call(req.clone()).await;

                match result {
                    Ok(response) => {
                        config.event_listeners.emit(&Event::Success {
                            pattern_name: config.name.clone(),
                            timestamp: Instant::now(),
                            attempts: attempt + 1,
                        });
                        return Ok(response);
                    }
                    Err(error) => {
                        if !config.policy.should_retry(&error) {
                            config.event_listeners.emit(&Event::IgnoredError {
                                pattern_name: config.name.clone(),
                                timestamp: Instant::now(),
                            });
                            return Err(error);
                        }

                        if attempt + 1 >= config.policy.max_attempts {
                            #[cfg(feature = "tracing")]
                            tracing::debug!(
                                retry = %config.name,
                                attempts = attempt + 1,
                                "attempts exhausted"
                            );

                            config.event_listeners.emit(&Event::Error {
                                pattern_name: config.name.clone(),
                                timestamp: Instant::now(),
                                attempts: attempt + 1,
                            });
                            return Err(error);
                        }

                        let delay = config.policy.next_backoff(attempt);

                        #[cfg(feature = "tracing")]
                        tracing::debug!(
                            retry = %config.name,
                            attempt = attempt + 1,
                            delay_ms = delay.as_millis() as u64,
                            "retrying after failure"
                        );

                        config.event_listeners.emit(&Event::Retry {
                            pattern_name: config.name.clone(),
                            timestamp: Instant::now(),
                            attempt: attempt + 1,
                            delay,
                        });

                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tower::{service_fn, Layer, ServiceExt};

    #[derive(Debug)]
    struct TestError;

    #[tokio::test]
    async fn no_retry_on_success() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);

        let service = service_fn(move |req: String| {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok::<_, TestError>(req)
            }
        });

        let layer = RetryConfig::<TestError>::builder()
            .max_attempts(3)
            .fixed_backoff(Duration::from_millis(5))
            .build();
        let service = layer.layer(service);

        let response = service.oneshot("ping".to_string()).await.unwrap();
        assert_eq!(response, "ping");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_until_success() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);

        let service = service_fn(move |_req: ()| {
            let c = Arc::clone(&c);
            async move {
                if c.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(TestError)
                } else {
                    Ok::<_, TestError>("ok")
                }
            }
        });

        let layer = RetryConfig::<TestError>::builder()
            .max_attempts(3)
            .fixed_backoff(Duration::from_millis(5))
            .build();
        let service = layer.layer(service);

        let response = service.oneshot(()).await.unwrap();
        assert_eq!(response, "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausts_attempt_budget() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);

        let service = service_fn(move |_req: ()| {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(TestError)
            }
        });

        let layer = RetryConfig::<TestError>::builder()
            .max_attempts(3)
            .fixed_backoff(Duration::from_millis(5))
            .build();
        let service = layer.layer(service);

        assert!(service.oneshot(()).await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn predicate_short_circuits() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);

        let service = service_fn(move |_req: ()| {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(TestError)
            }
        });

        let layer = RetryConfig::<TestError>::builder()
            .max_attempts(3)
            .fixed_backoff(Duration::from_millis(5))
            .retry_on(|_: &TestError| false)
            .build();
        let service = layer.layer(service);

        assert!(service.oneshot(()).await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
