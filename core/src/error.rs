//! Error types for the request helpers.
//!
//! # Design
//! The three variants follow the three places a call can fail: before
//! anything is sent, while the exchange is in flight, and while draining the
//! body. Callers that need to branch match on the variant; the `source`
//! carries the transport's own diagnosis.

use thiserror::Error;

/// Errors returned by every request helper.
#[derive(Debug, Error)]
pub enum HttpError {
    /// The request could not be built: malformed URL or an illegal header value.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Connecting, sending, or waiting for the response head failed,
    /// including hitting the configured timeout.
    ///
    /// Redirects are followed by the transport, so a 3xx response that
    /// carries no `Location` header cannot be returned as data and lands
    /// here with a `ureq::Error::Protocol` source.
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: ureq::Error,
    },

    /// The response head arrived but the body could not be read to its end.
    /// The status line is discarded along with the partial body. Running out
    /// of time mid-body also lands here, with `is_timeout` reporting it.
    #[error("reading response body from {url} failed: {source}")]
    BodyRead {
        url: String,
        #[source]
        source: ureq::Error,
    },
}

impl HttpError {
    /// True when the underlying transport gave up because the timeout elapsed.
    pub fn is_timeout(&self) -> bool {
        match self {
            HttpError::Transport { source, .. } | HttpError::BodyRead { source, .. } => {
                matches!(source, ureq::Error::Timeout(_))
            }
            HttpError::InvalidRequest(_) => false,
        }
    }
}
