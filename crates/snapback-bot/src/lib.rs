//! # snapback-bot
//!
//! The reply bot itself.
//!
//! This crate provides:
//! - Startup authentication (saved session first, password login as fallback)
//! - Mention detection over rich-text facets
//! - Round-robin image rotation
//! - Reply composition (upload + threaded post)
//! - The reconnecting firehose subscription loop

mod composer;
mod library;
mod mention;
mod rotator;
mod startup;
mod subscription;

pub use composer::{reply_ref_for, ReplyComposer};
pub use library::ImageLibrary;
pub use mention::is_mentioned;
pub use rotator::ImageRotator;
pub use startup::establish_session;
pub use subscription::{SubscriptionLoop, SubscriptionState, DEFAULT_RECONNECT_DELAY};
