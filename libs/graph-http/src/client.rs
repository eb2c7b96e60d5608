use crate::builder::HttpClientBuilder;
use crate::config::TransportSecurity;
use crate::error::HttpError;
use crate::request::RequestBuilder;
use crate::response::ResponseBody;
use bytes::Bytes;
use http::{Method, Request, Response};
use http_body_util::Full;
use std::future::{Future, poll_fn};
use std::pin::Pin;
use std::task::Poll;
use tower::Service;
use tower::buffer::Buffer;

pub type ServiceFuture =
    Pin<Box<dyn Future<Output = Result<Response<ResponseBody>, HttpError>> + Send>>;

/// Handle to the single buffer worker that owns the middleware stack.
pub type BufferedService = Buffer<Request<Full<Bytes>>, ServiceFuture>;

/// Cloneable HTTP client.
///
/// Every clone feeds the same `tower::buffer::Buffer` worker, so a clone is
/// a channel sender and the client can be shared across tasks as is.
#[derive(Clone)]
pub struct HttpClient {
    pub(crate) service: BufferedService,
    pub(crate) max_body_size: usize,
    pub(crate) transport_security: TransportSecurity,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("max_body_size", &self.max_body_size)
            .field("transport_security", &self.transport_security)
            .finish_non_exhaustive()
    }
}

impl HttpClient {
    /// Client with [`HttpClientConfig::default`](crate::HttpClientConfig).
    ///
    /// # Errors
    /// See [`HttpClientBuilder::build`].
    pub fn new() -> Result<Self, HttpError> {
        Self::builder().build()
    }

    #[must_use]
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Start a request. `url` must be absolute; it is checked by `send()`.
    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        RequestBuilder::new(
            self.service.clone(),
            self.max_body_size,
            method,
            url.to_owned(),
            self.transport_security,
        )
    }

    pub fn get(&self, url: &str) -> RequestBuilder {
        self.request(Method::GET, url)
    }
}

/// Unwrap an error coming out of the buffer.
///
/// Typed errors from the stack are returned as they are; any other error
/// means the worker itself has stopped.
pub fn unbuffer_error(err: tower::BoxError) -> HttpError {
    err.downcast::<HttpError>().map_or_else(
        |gone| {
            tracing::error!(error = %gone, "HTTP buffer worker stopped");
            HttpError::ServiceClosed
        },
        |typed| *typed,
    )
}

/// Claim a queue slot, failing with [`HttpError::Overloaded`] instead of
/// waiting when the queue is full.
pub async fn reserve_slot(service: &mut BufferedService) -> Result<(), HttpError> {
    let ready = poll_fn(|cx| Poll::Ready(service.poll_ready(cx))).await;
    match ready {
        Poll::Ready(Ok(())) => Ok(()),
        Poll::Ready(Err(e)) => Err(unbuffer_error(e)),
        Poll::Pending => Err(HttpError::Overloaded),
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn plain_http() -> HttpClient {
        HttpClient::builder().allow_insecure_http().build().unwrap()
    }

    #[tokio::test]
    async fn get_succeeds() {
        let mock = MockServer::start();
        let _m = mock.mock(|when, then| {
            when.method(GET).path("/me");
            then.status(200).json_body(json!({"id": "42"}));
        });

        let resp = plain_http()
            .get(&format!("{}/me", mock.base_url()))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), http::StatusCode::OK);
    }

    #[tokio::test]
    async fn error_status_is_still_ok() {
        let mock = MockServer::start();
        let _m = mock.mock(|when, then| {
            when.method(GET).path("/me");
            then.status(401)
                .json_body(json!({"error": {"code": "InvalidAuthenticationToken"}}));
        });

        let resp = plain_http()
            .get(&format!("{}/me", mock.base_url()))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), http::StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn clones_share_one_worker() {
        let mock = MockServer::start();
        let m = mock.mock(|when, then| {
            when.method(GET).path("/ping");
            then.status(200);
        });

        let client = plain_http();
        let other = client.clone();
        let url = format!("{}/ping", mock.base_url());
        let (a, b) = tokio::join!(client.get(&url).send(), other.get(&url).send());
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(m.calls(), 2);
    }

    #[test]
    fn unknown_buffer_error_means_closed() {
        let err: tower::BoxError = "worker gone".into();
        assert!(matches!(unbuffer_error(err), HttpError::ServiceClosed));
    }
}
