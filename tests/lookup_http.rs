use std::time::Duration;
use rust_decimal::Decimal;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use catalog_client::{ClientConfig, LookupOutcome, ProductServiceClient};
use catalog_resilience::circuitbreaker::CircuitState;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn product_body() -> serde_json::Value {
    serde_json::json!({
        "code": "P100",
        "name": "The Hunger Games",
        "description": "Winning will make you famous.",
        "imageUrl": "https://images.example.com/P100.jpg",
        "price": 34.00
    })
}

fn client_for(server: &MockServer) -> ProductServiceClient {
    let config = ClientConfig::builder(server.uri())
        .connect_timeout(Duration::from_secs(1))
        .read_timeout(Duration::from_secs(1))
        .max_attempts(3)
        .retry_initial_backoff(Duration::from_millis(5))
        .sliding_window_size(4)
        .minimum_number_of_calls(4)
        .wait_duration_in_open(Duration::from_millis(100))
        .build();
    ProductServiceClient::new(&config).unwrap()
}

#[tokio::test]
async fn fetches_and_deserializes_a_product() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/products/P100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(product_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let outcome = client.get_product_by_code("P100").await;

    let product = outcome.into_product().unwrap();
    assert_eq!(product.code, "P100");
    assert_eq!(product.name, "The Hunger Games");
    assert_eq!(product.image_url, "https://images.example.com/P100.jpg");
    assert_eq!(product.price, Decimal::new(3400, 2));
}

#[tokio::test]
async fn upstream_404_is_not_found_without_retries() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/products/UNKNOWN"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let outcome = client.get_product_by_code("UNKNOWN").await;

    assert_eq!(outcome, LookupOutcome::NotFound);
    // expect(1) on the mock verifies no retry happened on drop.
    assert_eq!(client.circuit_metrics().await.failure_count, 0);
}

/// Responds 503 a fixed number of times, then serves the product.
struct FlakyUpstream {
    failures: std::sync::atomic::AtomicUsize,
}

impl Respond for FlakyUpstream {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        if self
            .failures
            .fetch_update(
                std::sync::atomic::Ordering::SeqCst,
                std::sync::atomic::Ordering::SeqCst,
                |n| n.checked_sub(1),
            )
            .is_ok()
        {
            ResponseTemplate::new(503)
        } else {
            ResponseTemplate::new(200).set_body_json(product_body())
        }
    }
}

#[tokio::test]
async fn retries_past_server_errors() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/products/P100"))
        .respond_with(FlakyUpstream {
            failures: std::sync::atomic::AtomicUsize::new(2),
        })
        .expect(3)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let outcome = client.get_product_by_code("P100").await;

    assert!(outcome.is_found());
}

#[tokio::test]
async fn persistent_server_errors_degrade_to_not_found() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/products/P100"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let outcome = client.get_product_by_code("P100").await;

    assert_eq!(outcome, LookupOutcome::NotFound);
    assert_eq!(client.circuit_metrics().await.failure_count, 3);
}

#[tokio::test]
async fn malformed_body_counts_as_a_failure() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/products/P100"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .expect(3)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let outcome = client.get_product_by_code("P100").await;

    assert_eq!(outcome, LookupOutcome::NotFound);
}

#[tokio::test]
async fn unreachable_upstream_degrades_to_not_found() {
    init_tracing();
    // Bind a server and drop it so the port refuses connections. A pooled
    // `MockServer::start()` keeps listening after drop, so use a dedicated
    // server from the builder.
    let server = MockServer::builder().start().await;
    let uri = server.uri();
    drop(server);

    let config = ClientConfig::builder(uri)
        .connect_timeout(Duration::from_millis(200))
        .read_timeout(Duration::from_millis(200))
        .max_attempts(2)
        .retry_initial_backoff(Duration::from_millis(5))
        .build();
    let client = ProductServiceClient::new(&config).unwrap();

    let outcome = client.get_product_by_code("P100").await;
    assert_eq!(outcome, LookupOutcome::NotFound);
    assert_eq!(client.circuit_metrics().await.failure_count, 2);
}

#[tokio::test]
async fn circuit_opens_against_a_broken_upstream() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/products/P100"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = client_for(&server);

    // Two degraded lookups fill the 4-call window and open the circuit.
    let _ = client.get_product_by_code("P100").await;
    let _ = client.get_product_by_code("P100").await;

    assert_eq!(client.circuit_state().await, CircuitState::Open);
    assert_eq!(
        client.get_product_by_code("P100").await,
        LookupOutcome::NotFound
    );
}
