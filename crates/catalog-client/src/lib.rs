//! Resilient client for the catalog service's product lookup endpoint.
//!
//! The order workflow needs product details (`GET {base}/api/products/{code}`)
//! from a separately deployed catalog service, and must keep working when
//! that service is slow, flaky, or down. This crate wraps the HTTP call in
//! the middleware from [`catalog_resilience`]:
//!
//! - per-attempt connect and read timeouts on the HTTP client,
//! - retry with exponential backoff for transient failures,
//! - a circuit breaker shared by all clones of the client,
//! - a terminal fallback that logs and degrades to "not found".
//!
//! Callers only ever see a [`LookupOutcome`]: the product, or its absence.
//!
//! ```no_run
//! use catalog_client::{ClientConfig, ProductServiceClient};
//!
//! # async fn run() -> Result<(), catalog_client::LookupError> {
//! let config = ClientConfig::builder("http://localhost:8081").build();
//! let client = ProductServiceClient::new(&config)?;
//!
//! match client.get_product_by_code("P100").await.product() {
//!     Some(product) => println!("{} costs {}", product.name, product.price),
//!     None => println!("no such product"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod product;
pub mod transport;

pub use client::ProductServiceClient;
pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::LookupError;
pub use product::{LookupOutcome, ProductRef};
pub use transport::HttpTransport;
