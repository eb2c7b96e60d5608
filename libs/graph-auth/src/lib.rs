#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! Bearer credential attachment for outbound Graph requests.
//!
//! The pieces, from the host application inwards:
//!
//! - [`HostContext`] / [`ContextSlot`]: which signed-in session requests are
//!   made for. The slot holds a weak handle and can be re-bound at any time.
//! - [`AccessTokenSource`]: the external authentication service that hands
//!   out access tokens per host context.
//! - [`CredentialProvider`]: the per-request capability that attaches a
//!   credential to outgoing headers; [`BearerCredentialProvider`] is the
//!   standard `Authorization: Bearer <token>` implementation.
//! - [`BearerAuthLayer`]: tower layer that calls a provider for every request
//!   and applies a [`MissingCredentialPolicy`] when no credential is available.
//! - [`HttpClientBuilderExt`]: plugs the layer into `graph_http`'s builder.

pub mod builder_ext;
pub mod context;
pub mod credential;
pub mod error;
pub mod layer;
pub mod secret;
pub mod source;

pub use builder_ext::HttpClientBuilderExt;
pub use context::{ContextSlot, HostContext};
pub use credential::{BearerCredentialProvider, CredentialProvider};
pub use error::TokenError;
pub use layer::{BearerAuthLayer, BearerAuthService, MissingCredentialPolicy};
pub use secret::SecretString;
pub use source::{AccessTokenSource, SessionTokenStore, StaticTokenSource};
