//! Feed subscription traits

use async_trait::async_trait;
use snapback_core::{MentionEvent, Result};

/// Opens subscriptions to a stream of post-creation events
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Connect, optionally resuming from `cursor` (microseconds since epoch)
    async fn subscribe(&self, cursor: Option<i64>) -> Result<Box<dyn FeedSubscription>>;
}

/// A live subscription
#[async_trait]
pub trait FeedSubscription: Send {
    /// Wait for the next post-creation event
    ///
    /// Any error means the subscription is broken and must be closed.
    async fn next_event(&mut self) -> Result<MentionEvent>;

    /// Tear down the connection. Safe to call on an already broken subscription.
    async fn close(&mut self);

    /// Position of the last event seen, if any
    fn cursor(&self) -> Option<i64> {
        None
    }
}
