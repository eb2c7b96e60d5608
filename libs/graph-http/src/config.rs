use std::time::Duration;

/// `User-Agent` sent when the caller does not configure one.
pub const DEFAULT_USER_AGENT: &str = concat!("graph-http/", env!("CARGO_PKG_VERSION"));

/// Where trusted TLS roots come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum TlsRootConfig {
    /// Bundled Mozilla roots; identical on every host.
    #[default]
    WebPki,
    /// The operating system's certificate store.
    Native,
}

/// Which URL schemes the client will talk to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransportSecurity {
    /// `https://` only.
    #[default]
    TlsOnly,
    /// `http://` as well. Bearer tokens then travel in clear text; meant for
    /// local mock servers.
    AllowInsecureHttp,
}

/// Connection pool tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Close pooled connections idle for this long; `None` keeps hyper's
    /// default.
    pub idle_timeout: Option<Duration>,
    pub max_idle_per_host: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Some(Duration::from_secs(90)),
            max_idle_per_host: 32,
        }
    }
}

/// Settings for [`HttpClientBuilder`](crate::HttpClientBuilder).
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Upper bound for one request, connect through last response byte.
    pub request_timeout: Duration,
    /// Bodies larger than this fail with
    /// [`HttpError::BodyTooLarge`](crate::HttpError::BodyTooLarge).
    pub max_body_size: usize,
    pub user_agent: String,
    pub transport: TransportSecurity,
    pub tls_roots: TlsRootConfig,
    /// Requests that may queue in front of the shared service before
    /// [`HttpError::Overloaded`](crate::HttpError::Overloaded) is returned.
    pub buffer_capacity: usize,
    pub pool: PoolConfig,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            max_body_size: 10 << 20,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            transport: TransportSecurity::default(),
            tls_roots: TlsRootConfig::default(),
            buffer_capacity: 1024,
            pool: PoolConfig::default(),
        }
    }
}
