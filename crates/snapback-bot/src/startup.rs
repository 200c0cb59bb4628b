//! Startup authentication
//!
//! Prefer the saved session; fall back to a password login when there is
//! none or the server rejects it. A failed login is fatal for the caller.

use snapback_atproto::AtprotoApi;
use snapback_core::{AccountCredentials, Result, Session, SessionStore, SnapbackError};
use tracing::{info, warn};

/// Resume or create the bot's session, persisting a freshly created one
pub async fn establish_session(
    api: &dyn AtprotoApi,
    store: &SessionStore,
    account: &AccountCredentials,
) -> Result<Session> {
    if let Some(saved) = store.load().await {
        info!("Logging in via saved session");
        match api.resume_session(saved.clone()).await {
            Ok(()) => {
                info!("Session resumed with saved data");
                return Ok(saved);
            }
            Err(e) => {
                warn!("Saved session expired, logging in again: {}", e);
            }
        }
    } else {
        info!("Logging in with handle + password");
    }

    let mut session = api
        .login(&account.identifier, &account.password)
        .await
        .map_err(|e| match e {
            SnapbackError::Auth(_) => e,
            other => SnapbackError::Auth(other.to_string()),
        })?;
    session.active = Some(true);
    store.save(&session).await;

    info!("Logged into bot account as {} ({})", session.handle, session.did);
    Ok(session)
}
