//! Shared access point for the Graph service client.
//!
//! The composition root owns an [`AccessPointCell`]. The first
//! [`get_instance`](AccessPointCell::get_instance) creates the
//! [`ClientAccessPoint`]; every later call returns the same `Arc` and rebinds
//! the host context. The access point builds its [`GraphServiceClient`] on
//! first use and keeps it for its whole lifetime.

use std::fmt;
use std::sync::Arc;

use graph_auth::{
    AccessTokenSource, BearerCredentialProvider, ContextSlot, CredentialProvider, HostContext,
};
use parking_lot::Mutex;
use tokio::runtime::Handle;

use crate::client::GraphServiceClient;
use crate::config::GraphClientConfig;
use crate::error::GraphError;

/// Lazily builds and then hands out one shared [`GraphServiceClient`].
pub struct ClientAccessPoint {
    config: GraphClientConfig,
    context: ContextSlot,
    default_provider: Arc<BearerCredentialProvider>,
    runtime: Option<Handle>,
    client: Mutex<Option<Arc<GraphServiceClient>>>,
}

impl ClientAccessPoint {
    /// New access point with no host context bound and no client built.
    ///
    /// Remembers the Tokio runtime it is created on, if any, so the client
    /// can later be built from threads outside that runtime.
    #[must_use]
    pub fn new(config: GraphClientConfig, tokens: Arc<dyn AccessTokenSource>) -> Self {
        let context = ContextSlot::new();
        let default_provider = Arc::new(BearerCredentialProvider::new(tokens, context.clone()));
        Self {
            config,
            context,
            default_provider,
            runtime: Handle::try_current().ok(),
            client: Mutex::new(None),
        }
    }

    /// Runtime that drives the client's transport.
    #[must_use]
    pub fn with_runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Make `context` the one credentials are looked up for. Last call wins.
    pub fn bind_context(&self, context: &Arc<HostContext>) {
        self.context.bind(context);
    }

    /// Currently bound host context, if the host still holds it.
    #[must_use]
    pub fn context(&self) -> Option<Arc<HostContext>> {
        self.context.current()
    }

    /// The default provider: `Authorization: Bearer <token>` for the bound
    /// context.
    #[must_use]
    pub fn credential_provider(&self) -> Arc<dyn CredentialProvider> {
        self.default_provider.clone()
    }

    /// Whether the shared client has been built.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.client.lock().is_some()
    }

    /// The shared client, built with the default credential provider if it
    /// does not exist yet.
    ///
    /// Callable from any thread: without a current runtime the one captured
    /// at creation drives the transport.
    ///
    /// # Errors
    /// [`GraphError::Config`] or [`GraphError::Http`] if the first build
    /// fails (including [`HttpError::NoRuntime`](graph_http::HttpError::NoRuntime)
    /// when no runtime is known); the access point stays uninitialized and
    /// a later call retries.
    pub fn client(&self) -> Result<Arc<GraphServiceClient>, GraphError> {
        self.get_or_build(self.credential_provider(), false)
    }

    /// The shared client, built with `provider` if it does not exist yet.
    ///
    /// Once a client exists `provider` is ignored: the client keeps the
    /// provider it was first built with.
    ///
    /// # Errors
    /// See [`client`](Self::client).
    pub fn client_with(
        &self,
        provider: Arc<dyn CredentialProvider>,
    ) -> Result<Arc<GraphServiceClient>, GraphError> {
        self.get_or_build(provider, true)
    }

    fn get_or_build(
        &self,
        provider: Arc<dyn CredentialProvider>,
        explicit: bool,
    ) -> Result<Arc<GraphServiceClient>, GraphError> {
        let mut slot = self.client.lock();
        if let Some(client) = slot.as_ref() {
            if explicit {
                tracing::debug!("graph client already built; supplied credential provider ignored");
            }
            return Ok(Arc::clone(client));
        }

        let mut builder =
            GraphServiceClient::builder(self.config.clone()).credential_provider(provider);
        if let Some(handle) = &self.runtime {
            builder = builder.runtime(handle.clone());
        }
        let client = Arc::new(builder.build()?);
        *slot = Some(Arc::clone(&client));
        Ok(client)
    }
}

impl fmt::Debug for ClientAccessPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientAccessPoint")
            .field("context", &self.context)
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}

/// Holder that creates the [`ClientAccessPoint`] on first request.
///
/// Owned by the composition root and passed to whoever needs the client.
pub struct AccessPointCell {
    config: GraphClientConfig,
    tokens: Arc<dyn AccessTokenSource>,
    runtime: Option<Handle>,
    instance: Mutex<Option<Arc<ClientAccessPoint>>>,
}

impl AccessPointCell {
    /// Captures the current Tokio runtime, if any; see
    /// [`with_runtime`](Self::with_runtime).
    #[must_use]
    pub fn new(config: GraphClientConfig, tokens: Arc<dyn AccessTokenSource>) -> Self {
        Self {
            config,
            tokens,
            runtime: Handle::try_current().ok(),
            instance: Mutex::new(None),
        }
    }

    /// Runtime handed to the access point for its transport worker.
    #[must_use]
    pub fn with_runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// The access point, created on the first call.
    ///
    /// `context` is bound on every call, including when the access point
    /// already exists.
    #[must_use]
    pub fn get_instance(&self, context: &Arc<HostContext>) -> Arc<ClientAccessPoint> {
        let mut slot = self.instance.lock();
        let access_point = slot.get_or_insert_with(|| {
            tracing::debug!(context = context.id(), "creating graph client access point");
            let mut access_point =
                ClientAccessPoint::new(self.config.clone(), Arc::clone(&self.tokens));
            if let Some(handle) = &self.runtime {
                access_point = access_point.with_runtime(handle.clone());
            }
            Arc::new(access_point)
        });
        access_point.bind_context(context);
        Arc::clone(access_point)
    }

    /// The access point if one was created.
    #[must_use]
    pub fn get(&self) -> Option<Arc<ClientAccessPoint>> {
        self.instance.lock().clone()
    }
}

impl fmt::Debug for AccessPointCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessPointCell")
            .field("instance", &*self.instance.lock())
            .finish_non_exhaustive()
    }
}
