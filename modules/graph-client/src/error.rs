use graph_http::HttpError;
use serde::Deserialize;
use thiserror::Error;

/// Errors returned by the Graph service client and the access point.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GraphError {
    /// Transport-level failure, including credential attachment under the
    /// `reject` policy ([`HttpError::Credentials`]).
    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("invalid request url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Graph answered with a non-success status.
    #[error("graph returned {status} {code}: {message}")]
    Service {
        status: u16,
        code: String,
        message: String,
    },

    /// A request URL or paging link pointed away from the configured Graph
    /// origin.
    #[error("refusing to send credentials outside the graph origin: {0}")]
    UntrustedLink(String),

    #[error("invalid graph client configuration: {0}")]
    Config(String),
}

impl GraphError {
    /// Request was refused by Graph for lack of valid credentials.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Service { status: 401, .. })
    }

    /// Request was never sent because no credential could be attached.
    #[must_use]
    pub fn is_missing_credential(&self) -> bool {
        matches!(self, Self::Http(HttpError::Credentials(_)))
    }

    /// Build a [`GraphError::Service`] from a non-success response body.
    ///
    /// Graph wraps failures as `{"error":{"code":..,"message":..}}`; anything
    /// else is reported with an empty code and the raw body as the message.
    #[must_use]
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        #[derive(Deserialize)]
        struct Envelope {
            error: ServiceError,
        }

        #[derive(Deserialize)]
        struct ServiceError {
            #[serde(default)]
            code: String,
            #[serde(default)]
            message: String,
        }

        match serde_json::from_slice::<Envelope>(body) {
            Ok(Envelope { error }) => Self::Service {
                status,
                code: error.code,
                message: error.message,
            },
            Err(_) => Self::Service {
                status,
                code: String::new(),
                message: String::from_utf8_lossy(body)
                    .chars()
                    .take(graph_http::security::ERROR_BODY_PREVIEW_LIMIT)
                    .collect(),
            },
        }
    }
}
