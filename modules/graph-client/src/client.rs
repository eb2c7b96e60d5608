use std::fmt;
use std::sync::Arc;

use graph_auth::{CredentialProvider, HttpClientBuilderExt};
use graph_http::{HttpClient, HttpClientBuilder};
use serde::de::DeserializeOwned;
use tokio::runtime::Handle;
use url::Url;

use crate::config::GraphClientConfig;
use crate::error::GraphError;
use crate::models::{Collection, Event, EventsQuery, User};

/// REST client for the Graph API.
///
/// Cheap to share behind an `Arc`; every request goes through the same
/// transport stack, including the credential provider it was built with.
#[derive(Clone)]
pub struct GraphServiceClient {
    http: HttpClient,
    base: Url,
    max_pages: usize,
}

impl GraphServiceClient {
    #[must_use]
    pub fn builder(config: GraphClientConfig) -> GraphServiceClientBuilder {
        GraphServiceClientBuilder::new(config)
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Resolve `path` against the base URL.
    ///
    /// An absolute URL is accepted only on the base URL's origin, so the
    /// bearer token never leaves it.
    ///
    /// # Errors
    /// [`GraphError::InvalidUrl`] if `path` cannot be joined,
    /// [`GraphError::UntrustedLink`] for another origin.
    pub fn url(&self, path: &str) -> Result<Url, GraphError> {
        let url = self.base.join(path.trim_start_matches('/'))?;
        self.same_origin(url, path)
    }

    /// `GET` a path relative to the base URL and decode the JSON body.
    ///
    /// # Errors
    /// [`GraphError::Http`] for transport or credential failures,
    /// [`GraphError::Service`] for a non-success status, and see
    /// [`url`](Self::url).
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, GraphError> {
        let url = self.url(path)?;
        self.fetch(&url).await
    }

    /// The signed-in user.
    ///
    /// # Errors
    /// See [`get_json`](Self::get_json).
    pub async fn me(&self) -> Result<User, GraphError> {
        self.get_json("me").await
    }

    /// Calendar events of the signed-in user.
    ///
    /// Follows `@odata.nextLink` until the last page or the configured page
    /// limit, whichever comes first.
    ///
    /// # Errors
    /// See [`get_json`](Self::get_json); additionally
    /// [`GraphError::UntrustedLink`] if a next link leaves the Graph origin.
    pub async fn list_events(&self, query: &EventsQuery) -> Result<Vec<Event>, GraphError> {
        let mut url = self.url("me/events")?;
        {
            let mut qp = url.query_pairs_mut();
            for (key, value) in query.pairs() {
                qp.append_pair(key, &value);
            }
        }

        let mut events = Vec::new();
        for page_no in 1..=self.max_pages {
            let page: Collection<Event> = self.fetch(&url).await?;
            events.extend(page.value);

            let Some(next) = page.next_link else {
                return Ok(events);
            };
            if page_no == self.max_pages {
                tracing::debug!(
                    max_pages = self.max_pages,
                    fetched = events.len(),
                    "page limit reached, remaining events not fetched"
                );
                break;
            }
            url = self.trusted_link(&next)?;
        }
        Ok(events)
    }

    async fn fetch<T: DeserializeOwned>(&self, url: &Url) -> Result<T, GraphError> {
        tracing::debug!(url = %url, "graph request");
        let resp = self
            .http
            .get(url.as_str())
            .header("accept", "application/json")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.bytes().await?;
            let err = GraphError::from_response(status.as_u16(), &body);
            tracing::debug!(status = status.as_u16(), error = %err, "graph request failed");
            return Err(err);
        }
        Ok(resp.json().await?)
    }

    fn trusted_link(&self, link: &str) -> Result<Url, GraphError> {
        self.same_origin(Url::parse(link)?, link)
    }

    fn same_origin(&self, url: Url, raw: &str) -> Result<Url, GraphError> {
        if url.origin() == self.base.origin() {
            Ok(url)
        } else {
            Err(GraphError::UntrustedLink(raw.to_owned()))
        }
    }
}

impl fmt::Debug for GraphServiceClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphServiceClient")
            .field("base", &self.base.as_str())
            .field("max_pages", &self.max_pages)
            .finish_non_exhaustive()
    }
}

/// Builds a [`GraphServiceClient`] from configuration and an optional
/// credential provider.
pub struct GraphServiceClientBuilder {
    config: GraphClientConfig,
    credential_provider: Option<Arc<dyn CredentialProvider>>,
    runtime: Option<Handle>,
}

impl GraphServiceClientBuilder {
    #[must_use]
    pub fn new(config: GraphClientConfig) -> Self {
        Self {
            config,
            credential_provider: None,
            runtime: None,
        }
    }

    /// Provider invoked for every request of the built client.
    ///
    /// Without one, requests go out without credentials.
    #[must_use]
    pub fn credential_provider(mut self, provider: Arc<dyn CredentialProvider>) -> Self {
        self.credential_provider = Some(provider);
        self
    }

    /// Runtime for the transport worker, for builds off a runtime thread.
    #[must_use]
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Build the client.
    ///
    /// # Errors
    /// [`GraphError::Config`] for invalid configuration, [`GraphError::Http`]
    /// if the transport cannot be set up (no runtime, TLS roots, user agent).
    pub fn build(self) -> Result<GraphServiceClient, GraphError> {
        let base = self.config.validate()?;

        let mut builder = HttpClientBuilder::with_config(self.config.http_config());
        if let Some(handle) = self.runtime {
            builder = builder.runtime(handle);
        }
        let authenticated = self.credential_provider.is_some();
        if let Some(provider) = self.credential_provider {
            builder = builder.with_credential_provider(provider, self.config.missing_credential);
        }
        let http = builder.build()?;

        tracing::debug!(
            base_url = %base,
            authenticated,
            policy = ?self.config.missing_credential,
            "graph service client built"
        );

        Ok(GraphServiceClient {
            http,
            base,
            max_pages: self.config.max_pages,
        })
    }
}

impl fmt::Debug for GraphServiceClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphServiceClientBuilder")
            .field("config", &self.config)
            .field("credential_provider", &self.credential_provider.is_some())
            .field("runtime", &self.runtime.is_some())
            .finish()
    }
}
