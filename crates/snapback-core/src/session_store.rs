//! On-disk session persistence
//!
//! The session file is a single pretty-printed JSON document. It is written
//! to a sibling temp file and renamed into place, so readers only ever see
//! the previous document or the new one.

use crate::fail_open::fail_open;
use crate::{Result, Session, SnapbackError};
use std::path::PathBuf;
use tracing::{info, warn};

/// Loads and saves the bot's [`Session`]
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read the saved session
    ///
    /// A missing or unparsable file is a normal startup condition and yields `None`.
    pub async fn load(&self) -> Option<Session> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) => {
                info!("No saved session found at {} ({})", self.path.display(), e);
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(session) => Some(session),
            Err(e) => {
                warn!(
                    "Ignoring unreadable session file {}: {}",
                    self.path.display(),
                    e
                );
                None
            }
        }
    }

    /// Persist `session`, replacing any previous file
    ///
    /// Failures are logged and swallowed; returns whether the write landed.
    pub async fn save(&self, session: &Session) -> bool {
        let saved = fail_open("session_store::save", || self.write(session))
            .await
            .is_some();
        if saved {
            info!("Session saved successfully");
        }
        saved
    }

    async fn write(&self, session: &Session) -> Result<()> {
        let json = serde_json::to_string_pretty(session)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                SnapbackError::SessionPersist(format!(
                    "Failed to create {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        // Write to temp file, then rename
        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, json).await.map_err(|e| {
            SnapbackError::SessionPersist(format!("Failed to write session file: {}", e))
        })?;
        tokio::fs::rename(&tmp_path, &self.path).await.map_err(|e| {
            SnapbackError::SessionPersist(format!("Failed to replace session file: {}", e))
        })?;

        Ok(())
    }
}
