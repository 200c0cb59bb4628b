//! Websocket client for Jetstream

use crate::event::JetstreamEvent;
use crate::source::{FeedSource, FeedSubscription};
use async_trait::async_trait;
use futures::StreamExt;
use snapback_core::{MentionEvent, Result, SnapbackError, POST_COLLECTION};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};
use url::Url;

/// Jetstream endpoint configuration
#[derive(Debug, Clone)]
pub struct Jetstream {
    endpoint: String,
    collection: String,
}

impl Jetstream {
    /// Subscribe to post creations on the Jetstream instance at `endpoint`
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            collection: POST_COLLECTION.to_string(),
        }
    }

    /// Build the subscribe URL for an optional resume cursor
    pub fn subscribe_url(&self, cursor: Option<i64>) -> Result<Url> {
        let mut url = Url::parse(&self.endpoint).map_err(|e| {
            SnapbackError::Config(format!("Invalid Jetstream URL {}: {}", self.endpoint, e))
        })?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("wantedCollections", &self.collection);
            if let Some(cursor) = cursor {
                query.append_pair("cursor", &cursor.to_string());
            }
        }

        Ok(url)
    }
}

#[async_trait]
impl FeedSource for Jetstream {
    async fn subscribe(&self, cursor: Option<i64>) -> Result<Box<dyn FeedSubscription>> {
        let url = self.subscribe_url(cursor)?;
        debug!("Connecting to {}", url);

        let (stream, _response) = connect_async(url.as_str()).await.map_err(|e| {
            SnapbackError::Subscription(format!("Failed to connect to {}: {}", url, e))
        })?;

        Ok(Box::new(JetstreamSubscription {
            stream,
            collection: self.collection.clone(),
            last_time_us: cursor,
        }))
    }
}

/// An open Jetstream websocket
pub struct JetstreamSubscription {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    collection: String,
    last_time_us: Option<i64>,
}

impl JetstreamSubscription {
    fn handle_text(&mut self, text: &str) -> Option<MentionEvent> {
        let event = match JetstreamEvent::parse(text) {
            Ok(event) => event,
            Err(e) => {
                warn!("Skipping malformed Jetstream frame: {}", e);
                return None;
            }
        };

        self.last_time_us = Some(event.time_us);
        event.into_post_created(&self.collection)
    }
}

#[async_trait]
impl FeedSubscription for JetstreamSubscription {
    async fn next_event(&mut self) -> Result<MentionEvent> {
        loop {
            let message = match self.stream.next().await {
                Some(Ok(message)) => message,
                Some(Err(e)) => {
                    return Err(SnapbackError::Subscription(format!("WebSocket error: {}", e)))
                }
                None => {
                    return Err(SnapbackError::Subscription(
                        "WebSocket stream ended".to_string(),
                    ))
                }
            };

            match message {
                Message::Text(text) => {
                    if let Some(event) = self.handle_text(&text) {
                        return Ok(event);
                    }
                }
                Message::Close(frame) => {
                    return Err(SnapbackError::Subscription(format!(
                        "WebSocket closed by server: {:?}",
                        frame
                    )));
                }
                // tungstenite answers pings itself; binary frames are only sent when compression is requested
                _ => {}
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            debug!("Ignoring error while closing Jetstream socket: {}", e);
        }
    }

    fn cursor(&self) -> Option<i64> {
        self.last_time_us
    }
}
