use crate::config::ClientConfig;
use crate::error::LookupError;
use crate::product::ProductRef;
use futures::future::BoxFuture;
use reqwest::{StatusCode, Url};
use std::task::{Context, Poll};
use tower::Service;
use tracing::debug;

/// The HTTP transport: a tower service issuing
/// `GET {base}/api/products/{code}` against the catalog service.
///
/// Response mapping:
/// - 2xx with a body: deserialized [`ProductRef`], returned as `Ok(Some(_))`.
/// - 404: the upstream's definitive "no such product", returned as
///   `Ok(None)` so neither the retry middleware nor the circuit breaker
///   treats it as a failure.
/// - anything else (connection errors, timeouts, 5xx, malformed bodies):
///   `Err(LookupError)`.
///
/// Connect and read timeouts are enforced by the underlying reqwest client,
/// so no call can block past the configured bounds. Dropping the returned
/// future aborts the in-flight request at the transport level.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpTransport {
    /// Builds the transport from the client configuration.
    pub fn new(config: &ClientConfig) -> Result<Self, LookupError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| LookupError::InvalidBaseUrl(format!("{}: {e}", config.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(LookupError::InvalidBaseUrl(config.base_url.clone()));
        }

        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.read_timeout)
            .build()?;

        Ok(Self { client, base_url })
    }

    /// Resolves the product endpoint for a code, path-encoding the code.
    fn product_url(&self, code: &str) -> Url {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .expect("base url is not cannot-be-a-base")
            .pop_if_empty()
            .extend(["api", "products", code]);
        url
    }
}

impl Service<String> for HttpTransport {
    type Response = Option<ProductRef>;
    type Error = LookupError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, code: String) -> Self::Future {
        let url = self.product_url(&code);
        let client = self.client.clone();

        Box::pin(async move {
            debug!(%url, "requesting product from catalog service");

            let response = client.get(url).send().await?;
            match response.status() {
                StatusCode::NOT_FOUND => Ok(None),
                status if status.is_success() => Ok(Some(response.json::<ProductRef>().await?)),
                status => Err(LookupError::UnexpectedStatus(status)),
            }
        })
    }
}
