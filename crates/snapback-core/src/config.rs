//! Configuration management for snapback
//!
//! Two sources:
//! - `snapback.toml` (optional) for endpoints, file locations and timing
//! - `ACCOUNT` / `PASSWORD` environment variables for the bot account

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{Result, SnapbackError};

/// Default config file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "snapback.toml";

/// Environment variable holding the account identifier (handle or DID)
pub const ACCOUNT_ENV: &str = "ACCOUNT";

/// Environment variable holding the account (app) password
pub const PASSWORD_ENV: &str = "PASSWORD";

/// Bot configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapbackConfig {
    /// PDS base URL used for XRPC calls
    #[serde(default = "default_service")]
    pub service: String,

    /// Jetstream subscribe endpoint
    #[serde(default = "default_jetstream_url")]
    pub jetstream_url: String,

    /// Directory holding the images and their manifest
    #[serde(default = "default_images_dir")]
    pub images_dir: PathBuf,

    /// Manifest file name, relative to `images_dir`
    #[serde(default = "default_manifest")]
    pub manifest: String,

    /// Where the session tokens are persisted
    #[serde(default = "default_session_file")]
    pub session_file: PathBuf,

    /// Fixed delay before reconnecting to the firehose
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,

    /// Encoding declared on upload when the extension gives no hint
    #[serde(default = "default_encoding")]
    pub default_encoding: String,
}

fn default_service() -> String {
    "https://bsky.social".to_string()
}

fn default_jetstream_url() -> String {
    "wss://jetstream1.us-east.bsky.network/subscribe".to_string()
}

fn default_images_dir() -> PathBuf {
    PathBuf::from("images")
}

fn default_manifest() -> String {
    "images.json".to_string()
}

fn default_session_file() -> PathBuf {
    PathBuf::from("tokens.json")
}

fn default_reconnect_delay_secs() -> u64 {
    10
}

fn default_encoding() -> String {
    "image/jpeg".to_string()
}

impl SnapbackConfig {
    /// Load configuration from `path`, or defaults when the file does not exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_toml(&content)
        } else {
            tracing::debug!("No config file at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| SnapbackError::Config(format!("Failed to parse config file: {}", e)))
    }

    /// Full path of the image manifest
    pub fn manifest_path(&self) -> PathBuf {
        self.images_dir.join(&self.manifest)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }
}

impl Default for SnapbackConfig {
    fn default() -> Self {
        Self {
            service: default_service(),
            jetstream_url: default_jetstream_url(),
            images_dir: default_images_dir(),
            manifest: default_manifest(),
            session_file: default_session_file(),
            reconnect_delay_secs: default_reconnect_delay_secs(),
            default_encoding: default_encoding(),
        }
    }
}

/// Login identifier and secret for the bot account
#[derive(Clone)]
pub struct AccountCredentials {
    pub identifier: String,
    pub password: String,
}

impl AccountCredentials {
    /// Read `ACCOUNT` and `PASSWORD` from the environment
    ///
    /// Empty values count as missing.
    pub fn from_env() -> Result<Self> {
        let identifier = std::env::var(ACCOUNT_ENV).ok().filter(|v| !v.is_empty());
        let password = std::env::var(PASSWORD_ENV).ok().filter(|v| !v.is_empty());

        match (identifier, password) {
            (Some(identifier), Some(password)) => Ok(Self {
                identifier,
                password,
            }),
            _ => Err(SnapbackError::ConfigMissing(format!(
                "{} and/or {} not set.",
                ACCOUNT_ENV, PASSWORD_ENV
            ))),
        }
    }
}

impl std::fmt::Debug for AccountCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountCredentials")
            .field("identifier", &self.identifier)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to prevent concurrent env var modifications
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn with_env_vars<F, R>(vars: &[(&str, Option<&str>)], f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let _guard = ENV_LOCK.lock().unwrap();

        let originals: Vec<_> = vars.iter().map(|(k, _)| (*k, env::var(k).ok())).collect();

        for (key, value) in vars {
            match value {
                Some(v) => env::set_var(key, v),
                None => env::remove_var(key),
            }
        }

        let result = f();

        for (key, original) in originals {
            match original {
                Some(v) => env::set_var(key, v),
                None => env::remove_var(key),
            }
        }

        result
    }

    #[test]
    fn test_defaults() {
        let config = SnapbackConfig::default();
        assert_eq!(config.service, "https://bsky.social");
        assert_eq!(config.reconnect_delay(), Duration::from_secs(10));
        assert_eq!(config.manifest_path(), PathBuf::from("images/images.json"));
        assert_eq!(config.session_file, PathBuf::from("tokens.json"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = SnapbackConfig::from_toml(
            r#"
            images_dir = "/srv/pics"
            reconnect_delay_secs = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.images_dir, PathBuf::from("/srv/pics"));
        assert_eq!(config.reconnect_delay_secs, 3);
        assert_eq!(config.default_encoding, "image/jpeg");
    }

    #[test]
    fn test_invalid_toml() {
        let result = SnapbackConfig::from_toml("reconnect_delay_secs = \"soon\"");
        assert!(matches!(result, Err(SnapbackError::Config(_))));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = SnapbackConfig::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.manifest, "images.json");
    }

    #[test]
    fn test_credentials_present() {
        with_env_vars(
            &[(ACCOUNT_ENV, Some("bot.bsky.social")), (PASSWORD_ENV, Some("hunter2"))],
            || {
                let creds = AccountCredentials::from_env().unwrap();
                assert_eq!(creds.identifier, "bot.bsky.social");
                assert!(!format!("{:?}", creds).contains("hunter2"));
            },
        );
    }

    #[test]
    fn test_credentials_missing_password() {
        with_env_vars(
            &[(ACCOUNT_ENV, Some("bot.bsky.social")), (PASSWORD_ENV, None)],
            || {
                let result = AccountCredentials::from_env();
                assert!(matches!(result, Err(SnapbackError::ConfigMissing(_))));
            },
        );
    }

    #[test]
    fn test_credentials_empty_account() {
        with_env_vars(
            &[(ACCOUNT_ENV, Some("")), (PASSWORD_ENV, Some("hunter2"))],
            || {
                assert!(AccountCredentials::from_env().is_err());
            },
        );
    }
}
