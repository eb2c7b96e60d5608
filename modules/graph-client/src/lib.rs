#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! Graph service client and the access point that shares it.
//!
//! ```ignore
//! let cell = AccessPointCell::new(config, Arc::new(StaticTokenSource::from_env("GRAPH_ACCESS_TOKEN")));
//! let access_point = cell.get_instance(&host_context);
//! let me = access_point.client()?.me().await?;
//! ```

pub mod access_point;
pub mod client;
pub mod config;
pub mod error;
pub mod models;

pub use access_point::{AccessPointCell, ClientAccessPoint};
pub use client::{GraphServiceClient, GraphServiceClientBuilder};
pub use config::{DEFAULT_BASE_URL, GraphClientConfig};
pub use error::GraphError;
pub use models::{Collection, DateTimeTimeZone, EmailAddress, Event, EventsQuery, Recipient, User};
