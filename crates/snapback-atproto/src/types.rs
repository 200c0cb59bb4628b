//! XRPC request/response shapes

use serde::{Deserialize, Serialize};
use snapback_core::{BlobRef, NewPost};

/// `com.atproto.server.createSession` input
#[derive(Serialize)]
pub(crate) struct CreateSessionRequest<'a> {
    pub identifier: &'a str,
    pub password: &'a str,
}

/// `com.atproto.server.refreshSession` output
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RefreshSessionResponse {
    pub access_jwt: String,
    pub refresh_jwt: String,
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
}

/// `com.atproto.server.getSession` output
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GetSessionResponse {
    pub did: String,
    pub handle: String,
    #[serde(default)]
    pub active: Option<bool>,
}

/// `com.atproto.repo.uploadBlob` output
#[derive(Debug, Deserialize)]
pub(crate) struct UploadBlobResponse {
    pub blob: BlobRef,
}

/// `com.atproto.repo.createRecord` input
#[derive(Serialize)]
pub(crate) struct CreateRecordRequest<'a> {
    pub repo: &'a str,
    pub collection: &'a str,
    pub record: &'a NewPost,
}

/// `com.atproto.repo.createRecord` output
#[derive(Debug, Deserialize)]
pub(crate) struct CreateRecordResponse {
    pub uri: String,
    pub cid: String,
}

/// Error body every XRPC endpoint returns on failure
#[derive(Debug, Default, Deserialize)]
pub(crate) struct XrpcErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// A non-success XRPC response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XrpcFailure {
    pub status: u16,
    /// Machine-readable error name (e.g. `ExpiredToken`)
    pub error: Option<String>,
    pub message: Option<String>,
}

impl XrpcFailure {
    /// Build from a status code and raw response body
    pub fn from_body(status: u16, body: &str) -> Self {
        let parsed: XrpcErrorBody = serde_json::from_str(body).unwrap_or_default();
        Self {
            status,
            error: parsed.error,
            message: parsed
                .message
                .or_else(|| (!body.trim().is_empty()).then(|| body.trim().to_string())),
        }
    }

    pub fn is_expired_token(&self) -> bool {
        self.error.as_deref() == Some("ExpiredToken")
    }
}

impl std::fmt::Display for XrpcFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "XRPC {}", self.status)?;
        if let Some(error) = &self.error {
            write!(f, " {}", error)?;
        }
        if let Some(message) = &self.message {
            write!(f, ": {}", message)?;
        }
        Ok(())
    }
}
