use rand::Rng;
use std::time::Duration;

/// Computes the wait interval before a given retry attempt.
///
/// `attempt` is zero-based: the interval returned for attempt `0` is the
/// delay between the initial call and the first retry.
pub trait IntervalFunction: Send + Sync {
    fn interval(&self, attempt: usize) -> Duration;
}

/// A constant interval between attempts.
#[derive(Debug, Clone)]
pub struct FixedInterval {
    interval: Duration,
}

impl FixedInterval {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl IntervalFunction for FixedInterval {
    fn interval(&self, _attempt: usize) -> Duration {
        self.interval
    }
}

/// Exponentially increasing interval: `initial * multiplier^attempt`,
/// optionally capped.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial_interval: Duration,
    multiplier: f64,
    max_interval: Option<Duration>,
}

impl ExponentialBackoff {
    /// Creates an exponential backoff doubling from the given initial
    /// interval, uncapped.
    pub fn new(initial_interval: Duration) -> Self {
        Self {
            initial_interval,
            multiplier: 2.0,
            max_interval: None,
        }
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub fn with_max_interval(mut self, max_interval: Duration) -> Self {
        self.max_interval = Some(max_interval);
        self
    }
}

impl IntervalFunction for ExponentialBackoff {
    fn interval(&self, attempt: usize) -> Duration {
        let factor = self.multiplier.powi(attempt as i32);
        let interval = self.initial_interval.mul_f64(factor);
        match self.max_interval {
            Some(max) => interval.min(max),
            None => interval,
        }
    }
}

/// Exponential backoff with randomized jitter.
///
/// Each interval is drawn uniformly from
/// `[base * (1 - factor), base * (1 + factor)]` where `base` is the
/// corresponding [`ExponentialBackoff`] interval. Jitter spreads out retries
/// from callers that failed at the same moment.
#[derive(Debug, Clone)]
pub struct ExponentialRandomBackoff {
    inner: ExponentialBackoff,
    randomization_factor: f64,
}

impl ExponentialRandomBackoff {
    pub fn new(initial_interval: Duration) -> Self {
        Self {
            inner: ExponentialBackoff::new(initial_interval),
            randomization_factor: 0.5,
        }
    }

    pub fn with_randomization_factor(mut self, factor: f64) -> Self {
        self.randomization_factor = factor.clamp(0.0, 1.0);
        self
    }
}

impl IntervalFunction for ExponentialRandomBackoff {
    fn interval(&self, attempt: usize) -> Duration {
        let base = self.inner.interval(attempt).as_secs_f64();
        let delta = base * self.randomization_factor;
        let jittered = rand::rng().random_range((base - delta)..=(base + delta));
        Duration::from_secs_f64(jittered.max(0.0))
    }
}

/// An interval computed by an arbitrary function of the attempt number.
pub struct FnInterval<F>
where
    F: Fn(usize) -> Duration + Send + Sync,
{
    f: F,
}

impl<F> FnInterval<F>
where
    F: Fn(usize) -> Duration + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> IntervalFunction for FnInterval<F>
where
    F: Fn(usize) -> Duration + Send + Sync,
{
    fn interval(&self, attempt: usize) -> Duration {
        (self.f)(attempt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_interval_is_constant() {
        let backoff = FixedInterval::new(Duration::from_millis(250));
        assert_eq!(backoff.interval(0), Duration::from_millis(250));
        assert_eq!(backoff.interval(7), Duration::from_millis(250));
    }

    #[test]
    fn exponential_doubles_by_default() {
        let backoff = ExponentialBackoff::new(Duration::from_millis(100));
        assert_eq!(backoff.interval(0), Duration::from_millis(100));
        assert_eq!(backoff.interval(1), Duration::from_millis(200));
        assert_eq!(backoff.interval(2), Duration::from_millis(400));
    }

    #[test]
    fn exponential_respects_cap() {
        let backoff = ExponentialBackoff::new(Duration::from_millis(100))
            .with_max_interval(Duration::from_millis(300));
        assert_eq!(backoff.interval(0), Duration::from_millis(100));
        assert_eq!(backoff.interval(1), Duration::from_millis(200));
        assert_eq!(backoff.interval(2), Duration::from_millis(300));
        assert_eq!(backoff.interval(10), Duration::from_millis(300));
    }

    #[test]
    fn random_backoff_stays_within_bounds() {
        let backoff = ExponentialRandomBackoff::new(Duration::from_millis(100))
            .with_randomization_factor(0.5);
        for attempt in 0..4 {
            let base = ExponentialBackoff::new(Duration::from_millis(100)).interval(attempt);
            let interval = backoff.interval(attempt);
            assert!(interval >= base.mul_f64(0.5));
            assert!(interval <= base.mul_f64(1.5));
        }
    }

    #[test]
    fn fn_interval_uses_closure() {
        let backoff = FnInterval::new(|attempt| Duration::from_secs((attempt + 1) as u64));
        assert_eq!(backoff.interval(0), Duration::from_secs(1));
        assert_eq!(backoff.interval(2), Duration::from_secs(3));
    }
}
