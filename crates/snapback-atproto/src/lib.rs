//! # snapback-atproto
//!
//! Minimal AT Protocol client for the snapback bot.
//!
//! The bot needs exactly four remote operations: log in, resume a saved
//! session, upload a blob, create a post. [`AtprotoApi`] is the seam the bot
//! is written against; [`XrpcClient`] talks to a real PDS over HTTPS and
//! [`MockAtprotoApi`] records calls for tests.
//!
//! ## Token refresh
//!
//! Access tokens are short-lived. When an authenticated call comes back with
//! `ExpiredToken`, the client refreshes once, retries the call, and hands the
//! new session to its [`SessionSink`] so it survives a restart.

mod api;
mod client;
mod mock;
mod types;

pub use api::{AtprotoApi, SessionSink};
pub use client::XrpcClient;
pub use mock::{MockAtprotoApi, RecordedUpload};
pub use types::XrpcFailure;
