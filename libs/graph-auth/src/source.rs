use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::context::HostContext;
use crate::error::TokenError;
use crate::secret::SecretString;

/// The authentication service: hands out access tokens per host context.
///
/// Implementations own sign-in and refresh; callers only ask for the current
/// token. A context the service does not know (yet) is reported as
/// [`TokenError::NotReady`].
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    /// Current access token for `context`.
    ///
    /// # Errors
    ///
    /// [`TokenError::NotReady`] if no token is available for the context yet;
    /// [`TokenError::Source`] for any other failure.
    async fn access_token(&self, context: &HostContext) -> Result<SecretString, TokenError>;
}

/// One fixed token for every context.
///
/// For hosts that obtain a token out of band, e.g. from an environment
/// variable.
#[derive(Clone, Debug)]
pub struct StaticTokenSource {
    token: Option<SecretString>,
}

impl StaticTokenSource {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        let token = SecretString::new(token);
        Self {
            token: (!token.is_empty()).then_some(token),
        }
    }

    /// Read the token from `var`; a missing or empty variable yields a source
    /// that reports [`TokenError::NotReady`].
    #[must_use]
    pub fn from_env(var: &str) -> Self {
        match std::env::var(var) {
            Ok(value) => Self::new(value),
            Err(_) => {
                tracing::debug!(var, "access token variable not set");
                Self { token: None }
            }
        }
    }
}

#[async_trait]
impl AccessTokenSource for StaticTokenSource {
    async fn access_token(&self, _context: &HostContext) -> Result<SecretString, TokenError> {
        self.token
            .clone()
            .ok_or_else(|| TokenError::NotReady("no access token configured".into()))
    }
}

/// In-memory sessions: tokens stored per context id.
///
/// Whatever performs the interactive sign-in calls
/// [`sign_in`](Self::sign_in); until then requests for that context are
/// [`TokenError::NotReady`].
#[derive(Default)]
pub struct SessionTokenStore {
    sessions: RwLock<HashMap<String, SecretString>>,
}

impl SessionTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store (or replace) the token for `context_id`.
    pub fn sign_in(&self, context_id: impl Into<String>, token: SecretString) {
        let context_id = context_id.into();
        tracing::debug!(context = %context_id, "session token stored");
        self.sessions.write().insert(context_id, token);
    }

    /// Drop the session for `context_id`; returns whether one existed.
    pub fn sign_out(&self, context_id: &str) -> bool {
        self.sessions.write().remove(context_id).is_some()
    }

    #[must_use]
    pub fn is_signed_in(&self, context_id: &str) -> bool {
        self.sessions.read().contains_key(context_id)
    }
}

impl std::fmt::Debug for SessionTokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTokenStore")
            .field("sessions", &self.sessions.read().len())
            .finish()
    }
}

#[async_trait]
impl AccessTokenSource for SessionTokenStore {
    async fn access_token(&self, context: &HostContext) -> Result<SecretString, TokenError> {
        self.sessions.read().get(context.id()).cloned().ok_or_else(|| {
            TokenError::NotReady(format!("no session for context '{}'", context.id()))
        })
    }
}
