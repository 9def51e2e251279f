use crate::retry::backoff::IntervalFunction;
use std::sync::Arc;
use std::time::Duration;

/// Predicate deciding whether a given error should be retried.
pub type RetryPredicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// The retry strategy: attempt budget, backoff and error filtering.
pub struct RetryPolicy<E> {
    pub(crate) max_attempts: usize,
    pub(crate) interval_fn: Arc<dyn IntervalFunction>,
    pub(crate) retry_predicate: Option<RetryPredicate<E>>,
}

impl<E> RetryPolicy<E> {
    pub(crate) fn new(max_attempts: usize, interval_fn: Arc<dyn IntervalFunction>) -> Self {
        Self {
            max_attempts,
            interval_fn,
            retry_predicate: None,
        }
    }

    /// Returns whether the error is eligible for a retry.
    ///
    /// Without a predicate every error is retried.
    pub fn should_retry(&self, error: &E) -> bool {
        match &self.retry_predicate {
            Some(predicate) => predicate(error),
            None => true,
        }
    }

    /// Returns the delay before the retry following the given zero-based
    /// attempt.
    pub fn next_backoff(&self, attempt: usize) -> Duration {
        self.interval_fn.interval(attempt)
    }
}
