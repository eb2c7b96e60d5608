use crate::client::BufferedService;
use crate::config::{HttpClientConfig, PoolConfig, TlsRootConfig, TransportSecurity};
use crate::error::HttpError;
use crate::layers::UserAgentLayer;
use crate::response::ResponseBody;
use crate::tls;
use bytes::Bytes;
use http::Response;
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::Client;
use hyper_util::rt::{TokioExecutor, TokioTimer};
use std::time::Duration;
use tokio::runtime::Handle;
use tower::buffer::Buffer;
use tower::timeout::TimeoutLayer;
use tower::util::BoxCloneService;
use tower::{ServiceBuilder, ServiceExt};
use tower_http::decompression::DecompressionLayer;

/// The service an auth wrapper receives and must return.
pub type AuthService =
    BoxCloneService<http::Request<Full<Bytes>>, http::Response<ResponseBody>, HttpError>;

type AuthWrap = Box<dyn FnOnce(AuthService) -> AuthService + Send>;

/// Assembles an [`HttpClient`](crate::HttpClient).
pub struct HttpClientBuilder {
    config: HttpClientConfig,
    auth: Option<AuthWrap>,
    runtime: Option<Handle>,
}

impl HttpClientBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(HttpClientConfig::default())
    }

    #[must_use]
    pub fn with_config(config: HttpClientConfig) -> Self {
        Self {
            config,
            auth: None,
            runtime: None,
        }
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    #[must_use]
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.config.max_body_size = size;
        self
    }

    #[must_use]
    pub fn transport(mut self, transport: TransportSecurity) -> Self {
        self.config.transport = transport;
        self
    }

    #[must_use]
    pub fn tls_roots(mut self, roots: TlsRootConfig) -> Self {
        self.config.tls_roots = roots;
        self
    }

    /// Queue depth in front of the shared service; 0 is raised to 1.
    #[must_use]
    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.config.buffer_capacity = capacity.max(1);
        self
    }

    #[must_use]
    pub fn pool(mut self, pool: PoolConfig) -> Self {
        self.config.pool = pool;
        self
    }

    /// Runtime that drives the request worker. Without one, `build()` uses
    /// the runtime it is called from.
    #[must_use]
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Shorthand for `.transport(TransportSecurity::AllowInsecureHttp)`.
    ///
    /// Debug builds only, unless the `allow-insecure-http` feature is on.
    #[must_use]
    #[cfg(any(debug_assertions, feature = "allow-insecure-http"))]
    pub fn allow_insecure_http(mut self) -> Self {
        tracing::warn!(
            target: "graph_http::security",
            "plain HTTP allowed; requests and their credentials are not encrypted"
        );
        self.config.transport = TransportSecurity::AllowInsecureHttp;
        self
    }

    /// Wrap the transport with an auth service.
    ///
    /// The wrapper sits directly under the request buffer, above timeout and
    /// transport, so it runs once for every request. Setting it twice keeps
    /// the second wrapper.
    #[must_use]
    pub fn with_auth_layer(
        mut self,
        wrap: impl FnOnce(AuthService) -> AuthService + Send + 'static,
    ) -> Self {
        self.auth = Some(Box::new(wrap));
        self
    }

    #[must_use]
    pub fn has_auth_layer(&self) -> bool {
        self.auth.is_some()
    }

    /// Build the client and spawn its buffer worker.
    ///
    /// # Errors
    /// [`HttpError::NoRuntime`] when no runtime was set and none is current;
    /// otherwise TLS roots cannot be loaded, or the user agent is not a valid
    /// header value.
    pub fn build(self) -> Result<crate::HttpClient, HttpError> {
        let Some(runtime) = self.runtime.or_else(|| Handle::try_current().ok()) else {
            return Err(HttpError::NoRuntime);
        };

        let HttpClientConfig {
            request_timeout,
            max_body_size,
            user_agent,
            transport,
            tls_roots,
            buffer_capacity,
            pool,
        } = self.config;

        if transport == TransportSecurity::AllowInsecureHttp {
            tracing::warn!("graph-http client built with insecure HTTP transport");
        }

        let connector = tls::https_connector(tls_roots, transport)?;
        let user_agent = UserAgentLayer::try_new(&user_agent)?;

        let mut hyper = Client::builder(TokioExecutor::new());
        // idle timeouts need a timer
        hyper
            .pool_timer(TokioTimer::new())
            .pool_max_idle_per_host(pool.max_idle_per_host);
        if let Some(idle) = pool.idle_timeout {
            hyper.pool_idle_timeout(idle);
        }
        let hyper = hyper.build::<_, Full<Bytes>>(connector);

        // Buffer -> [auth] -> error mapping -> Timeout -> User-Agent -> Decompression -> hyper
        let core: AuthService = ServiceBuilder::new()
            .layer(TimeoutLayer::new(request_timeout))
            .layer(user_agent)
            .layer(DecompressionLayer::new())
            .service(hyper)
            .map_response(erase_body)
            .map_err(move |e: tower::BoxError| classify(e, request_timeout))
            .boxed_clone();

        let service = match self.auth {
            Some(wrap) => wrap(core),
            None => core,
        };
        let (service, worker): (BufferedService, _) =
            Buffer::pair(service, buffer_capacity.max(1));
        runtime.spawn(worker);

        Ok(crate::HttpClient {
            service,
            max_body_size,
            transport_security: transport,
        })
    }
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Timeouts become [`HttpError::Timeout`]; typed errors from inner layers
/// pass through; anything else is a transport failure.
fn classify(err: tower::BoxError, timeout: Duration) -> HttpError {
    if err.is::<tower::timeout::error::Elapsed>() {
        return HttpError::Timeout(timeout);
    }
    match err.downcast::<HttpError>() {
        Ok(typed) => *typed,
        Err(other) => HttpError::Transport(other),
    }
}

fn erase_body<B>(response: Response<B>) -> Response<ResponseBody>
where
    B: hyper::body::Body<Data = Bytes> + Send + Sync + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    response.map(|body| body.map_err(Into::into).boxed())
}
