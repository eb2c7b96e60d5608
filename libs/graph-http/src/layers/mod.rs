//! Tower layers for the HTTP client middleware stack
//!
//! - [`UserAgentLayer`] - Adds User-Agent header to all requests
//!
//! Credential attachment lives in `graph-auth` and is plugged in through
//! [`HttpClientBuilder::with_auth_layer`](crate::HttpClientBuilder::with_auth_layer).

mod user_agent;

pub use user_agent::{UserAgentLayer, UserAgentService};
