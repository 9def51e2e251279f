use reqwest::StatusCode;
use thiserror::Error;

/// Failures internal to the lookup pipeline.
///
/// Every variant is a transient infrastructure failure from the caller's
/// point of view: the retry and circuit breaker middleware act on these, and
/// the fallback converts whatever survives into
/// [`LookupOutcome::NotFound`](crate::LookupOutcome::NotFound). A 404 from
/// the upstream is not an error at all; the transport maps it to `Ok(None)`.
#[derive(Debug, Error)]
pub enum LookupError {
    /// The configured base URL could not be parsed.
    #[error("invalid catalog service base url: {0}")]
    InvalidBaseUrl(String),

    /// The request failed at the transport level: connection refused,
    /// connect/read timeout, or a malformed response body.
    #[error("catalog service request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The upstream answered with a status that is neither success nor 404.
    #[error("catalog service returned unexpected status {0}")]
    UnexpectedStatus(StatusCode),
}

impl LookupError {
    /// Returns true if the failure was a connect or read timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, LookupError::Transport(e) if e.is_timeout())
    }
}
