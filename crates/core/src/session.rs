//! The authenticated-session capability the slot pipeline depends on.
//!
//! How a session is established (browser automation, plain HTTP login) is an adapter concern;
//! the pipeline only needs "issue an authenticated JSON GET" and a release hook.

use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::Value;

use crate::errors::{AuthenticationError, SessionError};

#[async_trait]
pub trait AuthenticatedSession: Send + Sync {
    async fn issue_authenticated_json(
        &self,
        url: &str,
        token: &SecretString,
    ) -> Result<Value, SessionError>;

    async fn close(&self) -> Result<(), SessionError>;
}

/// A live session plus the secondary token it was initialised with.
pub struct SessionGrant {
    session: Box<dyn AuthenticatedSession>,
    token: SecretString,
}

impl SessionGrant {
    pub fn new(session: Box<dyn AuthenticatedSession>, token: SecretString) -> Self {
        Self { session, token }
    }

    pub async fn get_json(&self, url: &str) -> Result<Value, SessionError> {
        self.session.issue_authenticated_json(url, &self.token).await
    }

    pub async fn close(self) -> Result<(), SessionError> {
        self.session.close().await
    }
}

impl std::fmt::Debug for SessionGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionGrant").field("token", &self.token).finish_non_exhaustive()
    }
}

#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn open(&self) -> Result<SessionGrant, AuthenticationError>;
}
