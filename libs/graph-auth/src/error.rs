use thiserror::Error;

/// Why a credential could not be produced for a request.
///
/// No variant ever carries a token value.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TokenError {
    /// The authentication service has no token for this context yet
    /// (not signed in, sign-in still in progress, session cleared).
    #[error("access token not ready: {0}")]
    NotReady(String),

    /// No host context is bound, or the host has already dropped it.
    #[error("no live host context bound")]
    ContextReleased,

    /// The token cannot be carried in an HTTP header.
    #[error("invalid access token: {0}")]
    InvalidToken(String),

    /// Any other failure reported by the token source.
    #[error("token source failed: {0}")]
    Source(String),
}

impl TokenError {
    /// Whether waiting (for sign-in or a refresh) may make the error go away.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::NotReady(_) | Self::ContextReleased)
    }
}
