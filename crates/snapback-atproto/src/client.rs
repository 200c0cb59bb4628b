//! XRPC client for a Bluesky PDS
//!
//! Holds the current session in memory. Every authenticated request goes
//! through [`XrpcClient::send_authed`], which refreshes an expired access
//! token once and retries.

use crate::api::{AtprotoApi, SessionSink};
use crate::types::{
    CreateRecordRequest, CreateRecordResponse, CreateSessionRequest, GetSessionResponse,
    RefreshSessionResponse, UploadBlobResponse, XrpcFailure,
};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use snapback_core::{
    BlobRef, NewPost, Result, Session, SnapbackError, StrongRef, POST_COLLECTION,
};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

const CREATE_SESSION: &str = "com.atproto.server.createSession";
const GET_SESSION: &str = "com.atproto.server.getSession";
const REFRESH_SESSION: &str = "com.atproto.server.refreshSession";
const UPLOAD_BLOB: &str = "com.atproto.repo.uploadBlob";
const CREATE_RECORD: &str = "com.atproto.repo.createRecord";

/// HTTP client for the bot's PDS
pub struct XrpcClient {
    http: reqwest::Client,
    service: String,
    session: RwLock<Option<Session>>,
    // Serializes refreshes so concurrent replies don't burn the same refresh token twice
    refresh_lock: Mutex<()>,
    sink: Option<Arc<dyn SessionSink>>,
}

impl XrpcClient {
    /// Create a client for the PDS at `service` (e.g. `https://bsky.social`)
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            service: service.into().trim_end_matches('/').to_string(),
            session: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            sink: None,
        }
    }

    /// Notify `sink` whenever tokens are refreshed
    pub fn with_session_sink(mut self, sink: Arc<dyn SessionSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Snapshot of the current session
    pub async fn session(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    fn endpoint(&self, nsid: &str) -> String {
        format!("{}/xrpc/{}", self.service, nsid)
    }

    async fn access_token(&self) -> Result<String> {
        self.session
            .read()
            .await
            .as_ref()
            .map(|s| s.access_jwt.clone())
            .ok_or_else(|| SnapbackError::Auth("Not logged in".to_string()))
    }

    /// Send an authenticated request, refreshing the session once on `ExpiredToken`
    async fn send_authed<F>(&self, build: F) -> Result<reqwest::Response>
    where
        F: Fn(&reqwest::Client) -> reqwest::RequestBuilder + Send + Sync,
    {
        let token = self.access_token().await?;
        let response = build(&self.http)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| SnapbackError::Api(format!("Failed to send request: {}", e)))?;

        if response.status().is_success() {
            return Ok(response);
        }

        let failure = read_failure(response).await;
        if !failure.is_expired_token() {
            return Err(SnapbackError::Api(failure.to_string()));
        }

        tracing::debug!("Access token expired, refreshing session");
        self.refresh(&token).await?;

        let token = self.access_token().await?;
        let response = build(&self.http)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| SnapbackError::Api(format!("Failed to send request: {}", e)))?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(SnapbackError::Api(read_failure(response).await.to_string()))
        }
    }

    /// Exchange the refresh token for a new token pair
    ///
    /// `stale_access` is the token that was rejected; if another task has
    /// already replaced it, this is a no-op.
    async fn refresh(&self, stale_access: &str) -> Result<()> {
        let _guard = self.refresh_lock.lock().await;

        let current = self
            .session()
            .await
            .ok_or_else(|| SnapbackError::Auth("No session to refresh".to_string()))?;
        if current.access_jwt != stale_access {
            return Ok(());
        }

        let response = self
            .http
            .post(self.endpoint(REFRESH_SESSION))
            .bearer_auth(&current.refresh_jwt)
            .send()
            .await
            .map_err(|e| SnapbackError::Api(format!("Failed to send refresh request: {}", e)))?;

        if !response.status().is_success() {
            let failure = read_failure(response).await;
            return Err(SnapbackError::Api(format!(
                "Session refresh rejected: {}",
                failure
            )));
        }

        let body: RefreshSessionResponse = response
            .json()
            .await
            .map_err(|e| SnapbackError::Api(format!("Failed to parse refresh response: {}", e)))?;

        let mut updated = current.refreshed(body.access_jwt, body.refresh_jwt);
        if let Some(handle) = body.handle {
            updated.handle = handle;
        }
        if body.active.is_some() {
            updated.active = body.active;
        }

        *self.session.write().await = Some(updated.clone());
        tracing::info!("Session refreshed for {}", updated.handle);

        if let Some(sink) = &self.sink {
            sink.persist(&updated).await;
        }

        Ok(())
    }
}

async fn read_failure(response: reqwest::Response) -> XrpcFailure {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    XrpcFailure::from_body(status, &body)
}

#[async_trait]
impl AtprotoApi for XrpcClient {
    async fn login(&self, identifier: &str, password: &str) -> Result<Session> {
        tracing::debug!("Creating session for {}", identifier);

        let response = self
            .http
            .post(self.endpoint(CREATE_SESSION))
            .json(&CreateSessionRequest {
                identifier,
                password,
            })
            .send()
            .await
            .map_err(|e| SnapbackError::Auth(format!("Failed to reach {}: {}", self.service, e)))?;

        if !response.status().is_success() {
            return Err(SnapbackError::Auth(read_failure(response).await.to_string()));
        }

        let session: Session = response
            .json()
            .await
            .map_err(|e| SnapbackError::Auth(format!("Failed to parse session: {}", e)))?;

        *self.session.write().await = Some(session.clone());
        Ok(session)
    }

    async fn resume_session(&self, session: Session) -> Result<()> {
        *self.session.write().await = Some(session);

        let url = self.endpoint(GET_SESSION);
        let checked = match self.send_authed(|http| http.get(url.as_str())).await {
            Ok(response) => response
                .json::<GetSessionResponse>()
                .await
                .map_err(|e| SnapbackError::Api(format!("Failed to parse session: {}", e))),
            Err(e) => Err(e),
        };

        match checked {
            Ok(info) => {
                let mut guard = self.session.write().await;
                if let Some(session) = guard.as_mut() {
                    session.did = info.did;
                    session.handle = info.handle;
                    if info.active.is_some() {
                        session.active = info.active;
                    }
                }
                Ok(())
            }
            Err(e) => {
                *self.session.write().await = None;
                Err(SnapbackError::SessionResume(e.to_string()))
            }
        }
    }

    async fn upload_blob(&self, bytes: Vec<u8>, encoding: &str) -> Result<BlobRef> {
        let url = self.endpoint(UPLOAD_BLOB);
        let size = bytes.len();

        let response = self
            .send_authed(|http| {
                http.post(url.as_str())
                    .header(CONTENT_TYPE, encoding)
                    .body(bytes.clone())
            })
            .await
            .map_err(|e| SnapbackError::Upload(e.to_string()))?;

        let uploaded: UploadBlobResponse = response
            .json()
            .await
            .map_err(|e| SnapbackError::Upload(format!("Failed to parse response: {}", e)))?;

        tracing::debug!("Uploaded {} bytes as {}", size, encoding);
        Ok(uploaded.blob)
    }

    async fn post(&self, post: NewPost) -> Result<StrongRef> {
        let did = self
            .session_did()
            .await
            .ok_or_else(|| SnapbackError::Auth("Not logged in".to_string()))?;

        let url = self.endpoint(CREATE_RECORD);
        let request = CreateRecordRequest {
            repo: &did,
            collection: POST_COLLECTION,
            record: &post,
        };

        let response = self
            .send_authed(|http| http.post(url.as_str()).json(&request))
            .await?;

        let created: CreateRecordResponse = response
            .json()
            .await
            .map_err(|e| SnapbackError::Api(format!("Failed to parse response: {}", e)))?;

        Ok(StrongRef {
            uri: created.uri,
            cid: created.cid,
        })
    }

    async fn session_did(&self) -> Option<String> {
        self.session.read().await.as_ref().map(|s| s.did.clone())
    }
}
