//! Bearer token source shared by the document and blob store clients.

use async_trait::async_trait;
use thiserror::Error;

/// Failure to produce a bearer token (signed out, refresh rejected).
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct TokenError(pub String);

impl TokenError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Supplies the bearer token sent with Firestore and Storage requests.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Return a token valid for at least the next request.
    async fn access_token(&self) -> Result<String, TokenError>;

    /// Drop any cached token so the next call fetches a fresh one.
    async fn invalidate(&self) {}
}

/// Fixed token, for tests and service-to-service tooling.
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

#[async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self) -> Result<String, TokenError> {
        Ok(self.0.clone())
    }
}
