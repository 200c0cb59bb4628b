//! Fail-open utilities for graceful degradation
//!
//! Some operations must never take the bot down: persisting a refreshed
//! session, for example, can fail and the process keeps running with the
//! in-memory copy. Those go through [`fail_open`].
//!
//! DO NOT use fail-open for login at startup. A rejected login is fatal.

use std::future::Future;
use tracing::warn;

use crate::Result;

/// Execute an operation that should fail open
///
/// Logs the error via `tracing::warn!` on failure and returns `None`.
///
/// # Usage
///
/// ```no_run
/// use snapback_core::fail_open::fail_open;
/// use snapback_core::Result;
///
/// async fn write_tokens() -> Result<()> {
///     Ok(())
/// }
///
/// async fn example() {
///     let saved = fail_open("session_store::save", || write_tokens()).await;
///     // saved is None if write_tokens() failed
/// }
/// ```
pub async fn fail_open<F, Fut, T>(operation_name: &str, f: F) -> Option<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match f().await {
        Ok(val) => Some(val),
        Err(e) => {
            warn!("{} failed (fail-open): {}", operation_name, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SnapbackError;

    #[tokio::test]
    async fn test_fail_open_success() {
        let result = fail_open("test_op", || async { Ok::<_, SnapbackError>(42) }).await;
        assert_eq!(result, Some(42));
    }

    #[tokio::test]
    async fn test_fail_open_failure() {
        let result = fail_open("test_op", || async {
            Err::<i32, _>(SnapbackError::SessionPersist("disk full".to_string()))
        })
        .await;
        assert_eq!(result, None);
    }
}
