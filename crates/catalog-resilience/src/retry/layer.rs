use crate::retry::config::RetryConfig;
use crate::retry::Retry;
use std::sync::Arc;
use tower::Layer;

/// A tower [`Layer`] that wraps a service in [`Retry`] middleware.
///
/// `E` is the error type of the wrapped service.
pub struct RetryLayer<E> {
    config: Arc<RetryConfig<E>>,
}

impl<E> RetryLayer<E> {
    pub(crate) fn new(config: RetryConfig<E>) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Creates a new builder for configuring a retry layer.
    pub fn builder() -> crate::retry::RetryConfigBuilder<E> {
        crate::retry::RetryConfigBuilder::new()
    }
}

impl<E> Clone for RetryLayer<E> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
        }
    }
}

impl<S, E> Layer<S> for RetryLayer<E> {
    type Service = Retry<S, E>;

    fn layer(&self, service: S) -> Self::Service {
        Retry::new(service, Arc::clone(&self.config))
    }
}
