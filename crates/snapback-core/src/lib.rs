//! # snapback-core
//!
//! Core types for the snapback reply bot.
//!
//! snapback watches the Bluesky Jetstream firehose for posts that mention its
//! account and answers each one with the next image from a local rotation.
//!
//! ## Contents
//!
//! - Unified error taxonomy ([`SnapbackError`])
//! - Configuration (`snapback.toml` + `ACCOUNT` / `PASSWORD` environment)
//! - AT Protocol record shapes shared by the client, feed and bot crates
//! - The on-disk session store
//! - Fail-open helper for operations that must never take the bot down

pub mod config;
mod error;
pub mod fail_open;
pub mod session_store;
mod types;

pub use config::{AccountCredentials, SnapbackConfig};
pub use error::{Result, SnapbackError};
pub use session_store::SessionStore;
pub use types::*;
