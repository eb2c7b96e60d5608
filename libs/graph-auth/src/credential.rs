use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use http::header::{AUTHORIZATION, HeaderName};
use http::{HeaderMap, HeaderValue};
use zeroize::Zeroizing;

use crate::context::ContextSlot;
use crate::error::TokenError;
use crate::source::AccessTokenSource;

/// Capability invoked by the transport for every outgoing request to attach
/// credentials to its headers.
///
/// On `Err` the headers must be left as they were; the auth layer decides
/// what happens to the request.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Attach credentials to `headers`.
    ///
    /// # Errors
    ///
    /// Returns a [`TokenError`] describing why no credential is available.
    async fn attach_credential(&self, headers: &mut HeaderMap) -> Result<(), TokenError>;
}

/// Sets `Authorization: Bearer <token>` using the token the
/// [`AccessTokenSource`] has for the context currently bound in the
/// [`ContextSlot`].
#[derive(Clone)]
pub struct BearerCredentialProvider {
    source: Arc<dyn AccessTokenSource>,
    context: ContextSlot,
    header_name: HeaderName,
}

impl BearerCredentialProvider {
    #[must_use]
    pub fn new(source: Arc<dyn AccessTokenSource>, context: ContextSlot) -> Self {
        Self {
            source,
            context,
            header_name: AUTHORIZATION,
        }
    }

    /// Same as [`new`](Self::new) but writes `<header_name>: Bearer <token>`.
    #[must_use]
    pub fn with_header_name(
        source: Arc<dyn AccessTokenSource>,
        context: ContextSlot,
        header_name: HeaderName,
    ) -> Self {
        Self {
            source,
            context,
            header_name,
        }
    }

    #[must_use]
    pub fn context(&self) -> &ContextSlot {
        &self.context
    }

    /// Fetch a token for the bound context and render the header value.
    async fn bearer_value(&self) -> Result<HeaderValue, TokenError> {
        let context = self.context.current().ok_or(TokenError::ContextReleased)?;
        let token = self.source.access_token(&context).await?;

        let raw = Zeroizing::new(format!("Bearer {}", token.expose()));
        let mut value = HeaderValue::from_str(&raw).map_err(|_| {
            TokenError::InvalidToken("token contains characters not allowed in a header".into())
        })?;
        value.set_sensitive(true);
        Ok(value)
    }
}

#[async_trait]
impl CredentialProvider for BearerCredentialProvider {
    async fn attach_credential(&self, headers: &mut HeaderMap) -> Result<(), TokenError> {
        let value = self.bearer_value().await?;
        // insert, not append: at most one credential header per request
        headers.insert(self.header_name.clone(), value);
        Ok(())
    }
}

impl fmt::Debug for BearerCredentialProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerCredentialProvider")
            .field("context", &self.context)
            .field("header_name", &self.header_name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::context::HostContext;
    use crate::secret::SecretString;
    use crate::source::{SessionTokenStore, StaticTokenSource};

    fn bound_slot(id: &str) -> (ContextSlot, Arc<HostContext>) {
        let slot = ContextSlot::new();
        let ctx = Arc::new(HostContext::new(id));
        slot.bind(&ctx);
        (slot, ctx)
    }

    #[tokio::test]
    async fn attaches_single_bearer_header() {
        let (slot, _ctx) = bound_slot("alice");
        let provider = BearerCredentialProvider::new(Arc::new(StaticTokenSource::new("T")), slot);

        let mut headers = HeaderMap::new();
        provider.attach_credential(&mut headers).await.unwrap();
        provider.attach_credential(&mut headers).await.unwrap();

        let values: Vec<_> = headers.get_all(AUTHORIZATION).iter().collect();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0], "Bearer T");
        assert!(values[0].is_sensitive());
    }

    #[tokio::test]
    async fn replaces_existing_authorization() {
        let (slot, _ctx) = bound_slot("alice");
        let provider = BearerCredentialProvider::new(Arc::new(StaticTokenSource::new("T")), slot);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic stale"));
        provider.attach_credential(&mut headers).await.unwrap();

        assert_eq!(headers.get_all(AUTHORIZATION).iter().count(), 1);
        assert_eq!(headers[AUTHORIZATION], "Bearer T");
    }

    #[tokio::test]
    async fn uses_token_of_currently_bound_context() {
        let store = Arc::new(SessionTokenStore::new());
        store.sign_in("alice", SecretString::new("tok-alice"));
        store.sign_in("bob", SecretString::new("tok-bob"));

        let (slot, _alice) = bound_slot("alice");
        let provider = BearerCredentialProvider::new(store, slot.clone());

        let bob = Arc::new(HostContext::new("bob"));
        slot.bind(&bob);

        let mut headers = HeaderMap::new();
        provider.attach_credential(&mut headers).await.unwrap();
        assert_eq!(headers[AUTHORIZATION], "Bearer tok-bob");
    }

    #[tokio::test]
    async fn not_ready_leaves_headers_untouched() {
        let (slot, _ctx) = bound_slot("carol");
        let provider = BearerCredentialProvider::new(Arc::new(SessionTokenStore::new()), slot);

        let mut headers = HeaderMap::new();
        let err = provider.attach_credential(&mut headers).await.unwrap_err();

        assert!(matches!(err, TokenError::NotReady(_)));
        assert!(headers.get(AUTHORIZATION).is_none());
    }

    #[tokio::test]
    async fn unbound_context_is_released() {
        let provider = BearerCredentialProvider::new(
            Arc::new(StaticTokenSource::new("T")),
            ContextSlot::new(),
        );

        let mut headers = HeaderMap::new();
        let err = provider.attach_credential(&mut headers).await.unwrap_err();
        assert!(matches!(err, TokenError::ContextReleased));
    }

    #[tokio::test]
    async fn header_hostile_token_is_invalid() {
        let (slot, _ctx) = bound_slot("alice");
        let provider =
            BearerCredentialProvider::new(Arc::new(StaticTokenSource::new("a\r\nb")), slot);

        let mut headers = HeaderMap::new();
        let err = provider.attach_credential(&mut headers).await.unwrap_err();
        assert!(matches!(err, TokenError::InvalidToken(_)));
        assert!(headers.is_empty());
    }

    #[tokio::test]
    async fn custom_header_name() {
        let (slot, _ctx) = bound_slot("alice");
        let provider = BearerCredentialProvider::with_header_name(
            Arc::new(StaticTokenSource::new("T")),
            slot,
            HeaderName::from_static("x-graph-auth"),
        );

        let mut headers = HeaderMap::new();
        provider.attach_credential(&mut headers).await.unwrap();
        assert_eq!(headers["x-graph-auth"], "Bearer T");
        assert!(headers.get(AUTHORIZATION).is_none());
    }

    #[test]
    fn debug_does_not_leak_source() {
        let provider = BearerCredentialProvider::new(
            Arc::new(StaticTokenSource::new("super-secret")),
            ContextSlot::new(),
        );
        assert!(!format!("{provider:?}").contains("super-secret"));
    }
}
