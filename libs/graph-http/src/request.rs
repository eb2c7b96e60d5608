use crate::client::{BufferedService, reserve_slot, unbuffer_error};
use crate::config::TransportSecurity;
use crate::error::{HttpError, InvalidUriKind};
use crate::response::HttpResponse;
use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::{Method, Request, Uri};
use http_body_util::Full;
use tower::Service;

/// One pending request.
///
/// Bad headers do not fail immediately; the first one is remembered and
/// returned by [`send`](Self::send).
#[must_use = "nothing is sent until .send() is awaited"]
pub struct RequestBuilder {
    service: BufferedService,
    max_body_size: usize,
    method: Method,
    url: String,
    headers: Vec<(HeaderName, HeaderValue)>,
    deferred: Option<HttpError>,
    transport_security: TransportSecurity,
}

impl RequestBuilder {
    pub(crate) fn new(
        service: BufferedService,
        max_body_size: usize,
        method: Method,
        url: String,
        transport_security: TransportSecurity,
    ) -> Self {
        Self {
            service,
            max_body_size,
            method,
            url,
            headers: Vec::new(),
            deferred: None,
            transport_security,
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        if self.deferred.is_none() {
            let parsed = HeaderName::try_from(name)
                .map_err(HttpError::from)
                .and_then(|n| Ok((n, HeaderValue::try_from(value)?)));
            match parsed {
                Ok(pair) => self.headers.push(pair),
                Err(e) => self.deferred = Some(e),
            }
        }
        self
    }

    /// Run the request through the stack.
    ///
    /// A response of any status is `Ok`; [`HttpResponse::json`] checks it.
    ///
    /// # Errors
    /// Header and URL problems, a full queue ([`HttpError::Overloaded`]) and
    /// whatever the stack fails with: transport, TLS, timeout, credentials.
    pub async fn send(mut self) -> Result<HttpResponse, HttpError> {
        if let Some(e) = self.deferred.take() {
            return Err(e);
        }
        let uri = parse_target(&self.url, self.transport_security)?;

        let mut request = Request::builder().method(self.method).uri(uri);
        for (name, value) in self.headers {
            request = request.header(name, value);
        }
        let request = request.body(Full::new(Bytes::new()))?;

        reserve_slot(&mut self.service).await?;
        let inner = self.service.call(request).await.map_err(unbuffer_error)?;
        Ok(HttpResponse {
            inner,
            max_body_size: self.max_body_size,
        })
    }
}

/// Parse `url` and check it is absolute with a scheme the transport allows.
fn parse_target(url: &str, transport: TransportSecurity) -> Result<Uri, HttpError> {
    let invalid = |kind, reason: String| HttpError::InvalidUri {
        url: url.to_owned(),
        kind,
        reason,
    };
    let refused = |scheme: &str, reason: &str| HttpError::InvalidScheme {
        scheme: scheme.to_owned(),
        reason: reason.to_owned(),
    };

    let uri: Uri = url
        .parse()
        .map_err(|e: http::uri::InvalidUri| invalid(InvalidUriKind::ParseError, e.to_string()))?;
    if uri.authority().is_none() {
        return Err(invalid(InvalidUriKind::MissingAuthority, "no host".into()));
    }
    match (uri.scheme_str(), transport) {
        (Some("https"), _) | (Some("http"), TransportSecurity::AllowInsecureHttp) => Ok(uri),
        (Some("http"), _) => Err(refused("http", "client is TLS only")),
        (Some(other), _) => Err(refused(other, "expected http or https")),
        (None, _) => Err(invalid(InvalidUriKind::MissingScheme, "no scheme".into())),
    }
}
