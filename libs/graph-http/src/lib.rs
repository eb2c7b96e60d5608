#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! HTTP transport for the Graph service client.
//!
//! A hyper client behind a small tower stack: rustls (HTTPS unless told
//! otherwise), pooled connections, a per-request timeout, a fixed
//! `User-Agent` and gzip/brotli/deflate decoding. One slot is reserved for an
//! auth wrapper that decorates every outgoing request.
//!
//! Requests are never retried and redirects are never followed; each failure
//! reaches the caller once.
//!
//! ```ignore
//! let client = graph_http::HttpClient::builder()
//!     .timeout(std::time::Duration::from_secs(10))
//!     .build()?;
//! let me: serde_json::Value = client
//!     .get("https://graph.microsoft.com/v1.0/me")
//!     .send()
//!     .await?
//!     .json()
//!     .await?;
//! ```

mod builder;
mod client;
mod config;
mod error;
mod layers;
mod request;
mod response;
pub mod security;
mod tls;

pub use builder::{AuthService, HttpClientBuilder};
pub use client::HttpClient;
pub use config::{
    DEFAULT_USER_AGENT, HttpClientConfig, PoolConfig, TlsRootConfig, TransportSecurity,
};
pub use error::{HttpError, InvalidUriKind};
pub use layers::{UserAgentLayer, UserAgentService};
pub use request::RequestBuilder;
pub use response::{HttpResponse, ResponseBody};
