//! Scripted [`FeedSource`] for tests

use crate::source::{FeedSource, FeedSubscription};
use async_trait::async_trait;
use snapback_core::{MentionEvent, Result, SnapbackError};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::time::Instant;

enum Script {
    ConnectFailure(String),
    Events(VecDeque<Result<MentionEvent>>),
}

#[derive(Default)]
struct FeedLog {
    subscribes: Vec<(Option<i64>, Instant)>,
    closes: usize,
}

/// Feed source that replays one script per `subscribe` call
///
/// Each subscription yields its scripted items in order, then stays silent
/// forever. Once the scripts run out, further subscriptions are silent too.
#[derive(Default)]
pub struct MockFeedSource {
    scripts: Mutex<VecDeque<Script>>,
    log: Arc<Mutex<FeedLog>>,
}

impl MockFeedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next subscription yields `items`
    pub fn with_subscription(self, items: Vec<Result<MentionEvent>>) -> Self {
        lock(&self.scripts).push_back(Script::Events(items.into()));
        self
    }

    /// Next `subscribe` call fails
    pub fn with_connect_failure(self, message: &str) -> Self {
        lock(&self.scripts).push_back(Script::ConnectFailure(message.to_string()));
        self
    }

    /// Cursor and (tokio) time of every subscribe attempt
    pub fn subscribe_calls(&self) -> Vec<(Option<i64>, Instant)> {
        lock(&self.log).subscribes.clone()
    }

    pub fn close_calls(&self) -> usize {
        lock(&self.log).closes
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[async_trait]
impl FeedSource for MockFeedSource {
    async fn subscribe(&self, cursor: Option<i64>) -> Result<Box<dyn FeedSubscription>> {
        lock(&self.log).subscribes.push((cursor, Instant::now()));

        let items = match lock(&self.scripts).pop_front() {
            Some(Script::ConnectFailure(message)) => {
                return Err(SnapbackError::Subscription(message))
            }
            Some(Script::Events(items)) => items,
            None => VecDeque::new(),
        };

        Ok(Box::new(MockSubscription {
            items,
            log: Arc::clone(&self.log),
        }))
    }
}

struct MockSubscription {
    items: VecDeque<Result<MentionEvent>>,
    log: Arc<Mutex<FeedLog>>,
}

#[async_trait]
impl FeedSubscription for MockSubscription {
    async fn next_event(&mut self) -> Result<MentionEvent> {
        match self.items.pop_front() {
            Some(item) => item,
            None => std::future::pending().await,
        }
    }

    async fn close(&mut self) {
        lock(&self.log).closes += 1;
    }
}
