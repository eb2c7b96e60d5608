use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use graph_http::HttpError;
use http::{Request, Response};
use serde::{Deserialize, Serialize};
use tower::{Layer, Service};

use crate::credential::CredentialProvider;

/// What to do with a request when the provider cannot produce a credential.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingCredentialPolicy {
    /// Fail the request with [`HttpError::Credentials`]; nothing is sent.
    #[default]
    Reject,
    /// Log one warning and send the request without credentials.
    SendUnauthenticated,
}

/// Tower layer that asks a [`CredentialProvider`] to decorate every outbound
/// request before forwarding it to the inner service.
#[derive(Clone)]
pub struct BearerAuthLayer {
    provider: Arc<dyn CredentialProvider>,
    policy: MissingCredentialPolicy,
}

impl BearerAuthLayer {
    #[must_use]
    pub fn new(provider: Arc<dyn CredentialProvider>, policy: MissingCredentialPolicy) -> Self {
        Self { provider, policy }
    }

    #[must_use]
    pub fn policy(&self) -> MissingCredentialPolicy {
        self.policy
    }
}

impl fmt::Debug for BearerAuthLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerAuthLayer")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl<S> Layer<S> for BearerAuthLayer {
    type Service = BearerAuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        BearerAuthService {
            inner,
            provider: Arc::clone(&self.provider),
            policy: self.policy,
        }
    }
}

/// Service created by [`BearerAuthLayer`].
#[derive(Clone)]
pub struct BearerAuthService<S> {
    inner: S,
    provider: Arc<dyn CredentialProvider>,
    policy: MissingCredentialPolicy,
}

impl<S> fmt::Debug for BearerAuthService<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerAuthService")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl<S, B, ResBody> Service<Request<B>> for BearerAuthService<S>
where
    S: Service<Request<B>, Response = Response<ResBody>, Error = HttpError>
        + Clone
        + Send
        + 'static,
    S::Future: Send,
    B: Send + 'static,
    ResBody: Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = HttpError;
    type Future = Pin<Box<dyn Future<Output = Result<Response<ResBody>, HttpError>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        // Clone-swap: the instance that was polled ready is the one that runs.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let provider = Arc::clone(&self.provider);
        let policy = self.policy;

        Box::pin(async move {
            if let Err(e) = provider.attach_credential(req.headers_mut()).await {
                match policy {
                    MissingCredentialPolicy::Reject => {
                        return Err(HttpError::Credentials(Box::new(e)));
                    }
                    MissingCredentialPolicy::SendUnauthenticated => {
                        tracing::warn!(
                            error = %e,
                            method = %req.method(),
                            "no credential available, sending request without Authorization header"
                        );
                    }
                }
            }
            inner.call(req).await
        })
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::context::{ContextSlot, HostContext};
    use crate::credential::BearerCredentialProvider;
    use crate::error::TokenError;
    use crate::source::{SessionTokenStore, StaticTokenSource};
    use bytes::Bytes;
    use http::header::AUTHORIZATION;
    use http::{HeaderMap, StatusCode};
    use http_body_util::Full;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    /// Inner service that echoes the Authorization header count and value.
    #[derive(Clone, Default)]
    struct Echo {
        calls: Arc<AtomicUsize>,
    }

    impl Service<Request<Full<Bytes>>> for Echo {
        type Response = Response<String>;
        type Error = HttpError;
        type Future = Pin<Box<dyn Future<Output = Result<Self::Response, HttpError>> + Send>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, req: Request<Full<Bytes>>) -> Self::Future {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let values: Vec<String> = req
                .headers()
                .get_all(AUTHORIZATION)
                .iter()
                .map(|v| v.to_str().unwrap().to_owned())
                .collect();
            Box::pin(async move {
                Ok(Response::builder()
                    .status(StatusCode::OK)
                    .body(values.join("|"))
                    .unwrap())
            })
        }
    }

    struct Failing;

    #[async_trait::async_trait]
    impl CredentialProvider for Failing {
        async fn attach_credential(&self, _headers: &mut HeaderMap) -> Result<(), TokenError> {
            Err(TokenError::NotReady("sign-in pending".into()))
        }
    }

    fn request() -> Request<Full<Bytes>> {
        Request::get("https://graph.test/v1.0/me")
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    fn static_provider(token: &str) -> (Arc<dyn CredentialProvider>, Arc<HostContext>) {
        let slot = ContextSlot::new();
        let ctx = Arc::new(HostContext::new("alice"));
        slot.bind(&ctx);
        let provider = BearerCredentialProvider::new(Arc::new(StaticTokenSource::new(token)), slot);
        (Arc::new(provider), ctx)
    }

    #[derive(Clone, Default)]
    struct Warnings(Arc<Mutex<Vec<String>>>);

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for Warnings {
        fn on_event(
            &self,
            event: &tracing::Event<'_>,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            if *event.metadata().level() == tracing::Level::WARN {
                let mut fields = Vec::new();
                event.record(&mut |field: &tracing::field::Field, value: &dyn fmt::Debug| {
                    fields.push(format!("{}={value:?}", field.name()));
                });
                let fields = fields.join(" ");
                self.0.lock().unwrap().push(fields);
            }
        }
    }

    #[tokio::test]
    async fn attaches_header_once() {
        let (provider, _ctx) = static_provider("T");
        let svc = BearerAuthLayer::new(provider, MissingCredentialPolicy::Reject)
            .layer(Echo::default());

        let resp = svc.oneshot(request()).await.unwrap();
        assert_eq!(resp.body(), "Bearer T");
    }

    #[tokio::test]
    async fn reject_policy_fails_without_calling_inner() {
        let echo = Echo::default();
        let calls = Arc::clone(&echo.calls);
        let svc = BearerAuthLayer::new(Arc::new(Failing), MissingCredentialPolicy::Reject)
            .layer(echo);

        let err = svc.oneshot(request()).await.unwrap_err();

        assert!(matches!(err, HttpError::Credentials(_)));
        assert!(err.to_string().contains("sign-in pending"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn lenient_policy_sends_unauthenticated_with_one_warning() {
        use tracing_subscriber::layer::SubscriberExt;

        let warnings = Warnings::default();
        let subscriber = tracing_subscriber::registry().with(warnings.clone());
        let _guard = tracing::subscriber::set_default(subscriber);

        let store = Arc::new(SessionTokenStore::new());
        let slot = ContextSlot::new();
        let ctx = Arc::new(HostContext::new("carol"));
        slot.bind(&ctx);
        let provider = Arc::new(BearerCredentialProvider::new(store, slot));

        let echo = Echo::default();
        let calls = Arc::clone(&echo.calls);
        let svc = BearerAuthLayer::new(provider, MissingCredentialPolicy::SendUnauthenticated)
            .layer(echo);

        let resp = svc.oneshot(request()).await.unwrap();

        assert_eq!(resp.body(), "");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let logged = warnings.0.lock().unwrap();
        assert_eq!(logged.len(), 1);
        assert!(logged[0].contains("carol"));
    }

    #[tokio::test]
    async fn warning_never_contains_token() {
        use tracing_subscriber::layer::SubscriberExt;

        struct BadToken;

        #[async_trait::async_trait]
        impl CredentialProvider for BadToken {
            async fn attach_credential(&self, _h: &mut HeaderMap) -> Result<(), TokenError> {
                Err(TokenError::InvalidToken("not a visible ascii string".into()))
            }
        }

        let warnings = Warnings::default();
        let _guard =
            tracing::subscriber::set_default(tracing_subscriber::registry().with(warnings.clone()));

        let svc = BearerAuthLayer::new(
            Arc::new(BadToken),
            MissingCredentialPolicy::SendUnauthenticated,
        )
        .layer(Echo::default());
        svc.oneshot(request()).await.unwrap();

        let logged = warnings.0.lock().unwrap();
        assert_eq!(logged.len(), 1);
        assert!(!logged[0].contains("Bearer"));
    }

    #[test]
    fn policy_deserializes_snake_case() {
        let p: MissingCredentialPolicy = serde_json::from_str(r#""send_unauthenticated""#).unwrap();
        assert_eq!(p, MissingCredentialPolicy::SendUnauthenticated);
        let p: MissingCredentialPolicy = serde_json::from_str(r#""reject""#).unwrap();
        assert_eq!(p, MissingCredentialPolicy::Reject);
        assert_eq!(MissingCredentialPolicy::default(), MissingCredentialPolicy::Reject);
    }

    #[test]
    fn debug_omits_provider() {
        let layer = BearerAuthLayer::new(Arc::new(Failing), MissingCredentialPolicy::Reject);
        assert_eq!(
            format!("{layer:?}"),
            "BearerAuthLayer { policy: Reject, .. }"
        );
    }
}
