//! Traits at the remote API seam

use async_trait::async_trait;
use snapback_core::{BlobRef, NewPost, Result, Session, SessionStore, StrongRef};
use tracing::info;

/// Remote operations the bot performs against its PDS
#[async_trait]
pub trait AtprotoApi: Send + Sync {
    /// Create a fresh session from identifier + password
    async fn login(&self, identifier: &str, password: &str) -> Result<Session>;

    /// Adopt a previously saved session, failing if the server rejects it
    async fn resume_session(&self, session: Session) -> Result<()>;

    /// Upload raw bytes declared as `encoding`
    async fn upload_blob(&self, bytes: Vec<u8>, encoding: &str) -> Result<BlobRef>;

    /// Create a post in the bot's own repo
    async fn post(&self, post: NewPost) -> Result<StrongRef>;

    /// DID of the logged-in account, if any
    async fn session_did(&self) -> Option<String>;
}

/// Receives the session every time the client rotates tokens
#[async_trait]
pub trait SessionSink: Send + Sync {
    async fn persist(&self, session: &Session);
}

#[async_trait]
impl SessionSink for SessionStore {
    async fn persist(&self, session: &Session) {
        if self.save(session).await {
            info!("Session refreshed and saved");
        }
    }
}
