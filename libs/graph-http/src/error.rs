use std::time::Duration;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Why a URL was refused, for callers that branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum InvalidUriKind {
    ParseError,
    /// No host.
    MissingAuthority,
    MissingScheme,
}

/// Everything that can go wrong between building a request and reading its
/// body.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum HttpError {
    #[error("request could not be built: {0}")]
    RequestBuild(#[from] http::Error),

    #[error("bad header name: {0}")]
    InvalidHeaderName(#[from] http::header::InvalidHeaderName),

    #[error("bad header value: {0}")]
    InvalidHeaderValue(#[from] http::header::InvalidHeaderValue),

    #[error("no response within {0:?}")]
    Timeout(Duration),

    /// Connect, I/O or protocol failure below HTTP.
    #[error("transport failure: {0}")]
    Transport(#[source] BoxError),

    #[error("TLS setup failed: {0}")]
    Tls(#[source] BoxError),

    /// The auth wrapper had nothing to attach and refused to send. The
    /// source is the wrapper's own error; `downcast_ref` recovers it.
    #[error("Credentials unavailable: {0}")]
    Credentials(#[source] BoxError),

    #[error("response body over {limit} bytes (read {actual})")]
    BodyTooLarge { limit: usize, actual: usize },

    /// A non-2xx status met by [`HttpResponse::json`](crate::HttpResponse::json).
    #[error("HTTP {status}: {body_preview}")]
    HttpStatus {
        status: http::StatusCode,
        /// First bytes of the body, lossily decoded.
        body_preview: String,
        content_type: Option<String>,
    },

    #[error("JSON decode failed: {0}")]
    Json(#[from] serde_json::Error),

    /// The request queue is full.
    #[error("request queue full")]
    Overloaded,

    /// The buffer worker is gone, usually because its runtime shut down.
    #[error("HTTP worker stopped")]
    ServiceClosed,

    /// `build()` ran outside a Tokio runtime and no runtime handle was given.
    #[error("no Tokio runtime to run the HTTP worker on")]
    NoRuntime,

    /// `reason` is for humans; match on `kind`.
    #[error("invalid URL '{url}': {reason}")]
    InvalidUri {
        url: String,
        kind: InvalidUriKind,
        reason: String,
    },

    /// Scheme refused by the configured [`TransportSecurity`](crate::TransportSecurity).
    #[error("scheme '{scheme}' refused: {reason}")]
    InvalidScheme { scheme: String, reason: String },
}

impl From<hyper_util::client::legacy::Error> for HttpError {
    fn from(err: hyper_util::client::legacy::Error) -> Self {
        HttpError::Transport(Box::new(err))
    }
}
