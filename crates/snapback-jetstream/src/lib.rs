//! # snapback-jetstream
//!
//! Post-creation events from the Bluesky Jetstream firehose.
//!
//! Jetstream is a JSON-over-websocket relay of repository commits. The bot
//! only cares about newly created posts, so [`Jetstream`] asks the server for
//! `app.bsky.feed.post` and drops every other commit, identity and account
//! event before they reach the caller.
//!
//! The subscription loop in `snapback-bot` is written against
//! [`FeedSource`] / [`FeedSubscription`]; [`MockFeedSource`] scripts those for tests.

mod event;
mod jetstream;
mod mock;
mod source;

pub use event::{CommitData, JetstreamEvent};
pub use jetstream::{Jetstream, JetstreamSubscription};
pub use mock::MockFeedSource;
pub use source::{FeedSource, FeedSubscription};
