//! Firehose subscription loop
//!
//! Explicit state machine over three states:
//!
//! ```text
//! Starting { cursor } --subscribed--> Connected --error--> Reconnecting
//!        ^                                                      |
//!        +------------------ fixed delay, cursor = None --------+
//! ```
//!
//! There is no terminal state; [`SubscriptionLoop::run`] only returns when
//! the process does. [`SubscriptionLoop::step`] performs one transition and
//! is what tests drive.
//!
//! Matched mentions are handed to the composer on their own task. The loop
//! never waits for a reply, so replies can land in any order.

use crate::composer::ReplyComposer;
use crate::mention::is_mentioned;
use snapback_core::MentionEvent;
use snapback_jetstream::{FeedSource, FeedSubscription};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Delay between a subscription error and the next connect attempt
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(10);

/// Where the loop is in its connect / reconnect cycle
pub enum SubscriptionState {
    /// About to open a subscription
    Starting { cursor: Option<i64> },
    /// Receiving events
    Connected {
        subscription: Box<dyn FeedSubscription>,
    },
    /// Subscription closed, waiting out the reconnect delay
    Reconnecting,
}

impl SubscriptionState {
    pub fn name(&self) -> &'static str {
        match self {
            SubscriptionState::Starting { .. } => "starting",
            SubscriptionState::Connected { .. } => "connected",
            SubscriptionState::Reconnecting => "reconnecting",
        }
    }
}

impl std::fmt::Debug for SubscriptionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubscriptionState::Starting { cursor } => {
                f.debug_struct("Starting").field("cursor", cursor).finish()
            }
            other => f.write_str(other.name()),
        }
    }
}

/// Wires the feed to the mention filter and the reply composer
pub struct SubscriptionLoop {
    source: Arc<dyn FeedSource>,
    composer: Arc<ReplyComposer>,
    self_did: String,
    reconnect_delay: Duration,
    initial_cursor: Option<i64>,
}

impl SubscriptionLoop {
    /// Create a loop replying to mentions of `self_did`
    pub fn new(
        source: Arc<dyn FeedSource>,
        composer: Arc<ReplyComposer>,
        self_did: impl Into<String>,
    ) -> Self {
        Self {
            source,
            composer,
            self_did: self_did.into(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            initial_cursor: None,
        }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Resume the very first subscription from `cursor`; reconnects always start from now
    pub fn with_initial_cursor(mut self, cursor: Option<i64>) -> Self {
        self.initial_cursor = cursor;
        self
    }

    pub fn initial_state(&self) -> SubscriptionState {
        SubscriptionState::Starting {
            cursor: self.initial_cursor,
        }
    }

    /// Run forever
    pub async fn run(&self) {
        let mut state = self.initial_state();
        loop {
            state = self.step(state).await;
        }
    }

    /// Run until `shutdown` resolves
    pub async fn run_until<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            _ = self.run() => {}
            _ = shutdown => info!("Shutdown requested, leaving the firehose"),
        }
    }

    /// Perform one state transition
    pub async fn step(&self, state: SubscriptionState) -> SubscriptionState {
        match state {
            SubscriptionState::Starting { cursor } => match self.source.subscribe(cursor).await {
                Ok(subscription) => {
                    info!("Starting Jetstream");
                    SubscriptionState::Connected { subscription }
                }
                Err(e) => {
                    error!(
                        "Could not connect to firehose, retrying in {} seconds: {}",
                        self.reconnect_delay.as_secs(),
                        e
                    );
                    SubscriptionState::Reconnecting
                }
            },

            SubscriptionState::Connected { mut subscription } => loop {
                match subscription.next_event().await {
                    Ok(event) => {
                        self.dispatch(event);
                    }
                    Err(e) => {
                        error!(
                            "Firehose interrupted, retrying in {} seconds: {}",
                            self.reconnect_delay.as_secs(),
                            e
                        );
                        if let Some(cursor) = subscription.cursor() {
                            debug!("Last cursor before interruption: {}", cursor);
                        }
                        subscription.close().await;
                        break SubscriptionState::Reconnecting;
                    }
                }
            },

            SubscriptionState::Reconnecting => {
                tokio::time::sleep(self.reconnect_delay).await;
                info!("Retrying to connect to firehose");
                SubscriptionState::Starting { cursor: None }
            }
        }
    }

    /// Spawn a reply task if `event` mentions the bot
    fn dispatch(&self, event: MentionEvent) {
        if !is_mentioned(&event.record, &self.self_did) {
            return;
        }

        info!("Bot was mentioned in post: {}", event.web_url());
        let composer = Arc::clone(&self.composer);
        tokio::spawn(async move {
            composer.reply_to(&event).await;
        });
    }
}
