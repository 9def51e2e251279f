use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;
use tower::{Layer, Service, ServiceExt};

use catalog_resilience::circuitbreaker::{CircuitBreakerConfig, CircuitBreakerError, CircuitState};
use catalog_resilience::retry::RetryConfig;

#[derive(Debug, PartialEq)]
struct Transient;

#[tokio::test]
async fn recovers_within_the_attempt_budget() {
    let calls = Arc::new(AtomicUsize::new(0));
    let inner_calls = Arc::clone(&calls);

    let service = tower::service_fn(move |_req: ()| {
        let calls = Arc::clone(&inner_calls);
        async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(Transient)
            } else {
                Ok("ok")
            }
        }
    });

    let layer = RetryConfig::<Transient>::builder()
        .max_attempts(3)
        .fixed_backoff(Duration::from_millis(5))
        .build();
    let service = layer.layer(service);

    let response = service.oneshot(()).await.unwrap();
    assert_eq!(response, "ok");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn gives_up_after_max_attempts() {
    let calls = Arc::new(AtomicUsize::new(0));
    let inner_calls = Arc::clone(&calls);

    let service = tower::service_fn(move |_req: ()| {
        let calls = Arc::clone(&inner_calls);
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(Transient)
        }
    });

    let layer = RetryConfig::<Transient>::builder()
        .max_attempts(3)
        .fixed_backoff(Duration::from_millis(5))
        .build();
    let service = layer.layer(service);

    assert!(service.oneshot(()).await.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn retry_listener_reports_one_based_attempts() {
    let retries = Arc::new(std::sync::Mutex::new(Vec::new()));
    let r = Arc::clone(&retries);

    let service = tower::service_fn(|_req: ()| async { Err::<(), _>(Transient) });

    let layer = RetryConfig::<Transient>::builder()
        .max_attempts(3)
        .fixed_backoff(Duration::from_millis(5))
        .on_retry(move |attempt, delay| {
            r.lock().unwrap().push((attempt, delay));
        })
        .build();
    let service = layer.layer(service);

    let _ = service.oneshot(()).await;

    let seen = retries.lock().unwrap().clone();
    // Two retries follow the initial attempt; the third failure is terminal.
    assert_eq!(
        seen,
        vec![
            (1, Duration::from_millis(5)),
            (2, Duration::from_millis(5)),
        ]
    );
}

#[tokio::test]
async fn exponential_backoff_doubles_the_delay() {
    let delays = Arc::new(std::sync::Mutex::new(Vec::new()));
    let d = Arc::clone(&delays);

    let service = tower::service_fn(|_req: ()| async { Err::<(), _>(Transient) });

    let layer = RetryConfig::<Transient>::builder()
        .max_attempts(4)
        .exponential_backoff(Duration::from_millis(10))
        .on_retry(move |_attempt, delay| {
            d.lock().unwrap().push(delay);
        })
        .build();
    let service = layer.layer(service);

    let _ = service.oneshot(()).await;

    let seen = delays.lock().unwrap().clone();
    assert_eq!(
        seen,
        vec![
            Duration::from_millis(10),
            Duration::from_millis(20),
            Duration::from_millis(40),
        ]
    );
}

#[tokio::test]
async fn predicate_stops_non_retryable_errors_immediately() {
    let calls = Arc::new(AtomicUsize::new(0));
    let inner_calls = Arc::clone(&calls);

    let service = tower::service_fn(move |_req: ()| {
        let calls = Arc::clone(&inner_calls);
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(Transient)
        }
    });

    let layer = RetryConfig::<Transient>::builder()
        .max_attempts(5)
        .fixed_backoff(Duration::from_millis(5))
        .retry_on(|_: &Transient| false)
        .build();
    let service = layer.layer(service);

    assert!(service.oneshot(()).await.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

// Retry stacked over a circuit breaker: each failing attempt is recorded by
// the breaker, and once the circuit opens the retry predicate stops the loop
// instead of hammering an upstream already judged unhealthy.
#[tokio::test]
async fn retry_over_breaker_stops_on_open_circuit() {
    let calls = Arc::new(AtomicUsize::new(0));
    let inner_calls = Arc::clone(&calls);

    let service = tower::service_fn(move |_req: ()| {
        let calls = Arc::clone(&inner_calls);
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(Transient)
        }
    });

    let breaker_layer = CircuitBreakerConfig::<(), Transient>::builder()
        .failure_rate_threshold(0.5)
        .sliding_window_size(2)
        .minimum_number_of_calls(2)
        .wait_duration_in_open(Duration::from_secs(60))
        .build();
    let breaker = breaker_layer.layer(service);
    let probe = breaker.clone();

    let retry_layer = RetryConfig::<CircuitBreakerError<Transient>>::builder()
        .max_attempts(5)
        .fixed_backoff(Duration::from_millis(5))
        .retry_on(|err: &CircuitBreakerError<Transient>| !err.is_circuit_open())
        .build();
    let service = retry_layer.layer(breaker);

    let err = service.oneshot(()).await.unwrap_err();
    assert!(err.is_circuit_open());

    // Two failures opened the circuit; the third attempt was rejected
    // without reaching the inner service.
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(probe.state().await, CircuitState::Open);
}

#[tokio::test]
async fn retry_over_breaker_recovers_before_the_circuit_opens() {
    let calls = Arc::new(AtomicUsize::new(0));
    let inner_calls = Arc::clone(&calls);

    let service = tower::service_fn(move |_req: ()| {
        let calls = Arc::clone(&inner_calls);
        async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 1 {
                Err(Transient)
            } else {
                Ok("ok")
            }
        }
    });

    let breaker_layer = CircuitBreakerConfig::<&str, Transient>::builder()
        .failure_rate_threshold(0.5)
        .sliding_window_size(10)
        .minimum_number_of_calls(10)
        .wait_duration_in_open(Duration::from_secs(60))
        .build();
    let breaker = breaker_layer.layer(service);
    let probe = breaker.clone();

    let retry_layer = RetryConfig::<CircuitBreakerError<Transient>>::builder()
        .max_attempts(3)
        .fixed_backoff(Duration::from_millis(5))
        .retry_on(|err: &CircuitBreakerError<Transient>| !err.is_circuit_open())
        .build();
    let service = retry_layer.layer(breaker);

    assert_eq!(service.oneshot(()).await.unwrap(), "ok");
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let metrics = probe.metrics().await;
    assert_eq!(metrics.failure_count, 1);
    assert_eq!(metrics.success_count, 1);
}
