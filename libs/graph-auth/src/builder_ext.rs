use std::sync::Arc;

use tower::ServiceExt;

use crate::credential::CredentialProvider;
use crate::layer::{BearerAuthLayer, MissingCredentialPolicy};

/// Extension trait for adding credential attachment to
/// [`graph_http::HttpClientBuilder`].
///
/// # Example
///
/// ```ignore
/// use graph_auth::{BearerCredentialProvider, HttpClientBuilderExt, MissingCredentialPolicy};
///
/// let provider = Arc::new(BearerCredentialProvider::new(source, slot));
/// let client = HttpClientBuilder::new()
///     .with_credential_provider(provider, MissingCredentialPolicy::Reject)
///     .build()?;
/// ```
pub trait HttpClientBuilderExt {
    /// Call `provider` for every request the built client sends.
    #[must_use]
    fn with_credential_provider(
        self,
        provider: Arc<dyn CredentialProvider>,
        policy: MissingCredentialPolicy,
    ) -> Self;
}

impl HttpClientBuilderExt for graph_http::HttpClientBuilder {
    fn with_credential_provider(
        self,
        provider: Arc<dyn CredentialProvider>,
        policy: MissingCredentialPolicy,
    ) -> Self {
        let layer = BearerAuthLayer::new(provider, policy);
        self.with_auth_layer(move |svc| {
            tower::ServiceBuilder::new()
                .layer(layer)
                .service(svc)
                .boxed_clone()
        })
    }
}
