//! In-memory [`AtprotoApi`] for tests

use crate::api::AtprotoApi;
use async_trait::async_trait;
use serde_json::Map;
use snapback_core::{BlobLink, BlobRef, NewPost, Result, Session, SnapbackError, StrongRef};
use std::sync::Mutex;

/// One call to `upload_blob` as seen by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedUpload {
    pub bytes: Vec<u8>,
    pub encoding: String,
}

#[derive(Default)]
struct MockState {
    session: Option<Session>,
    login_calls: usize,
    resume_calls: usize,
    uploads: Vec<RecordedUpload>,
    posts: Vec<NewPost>,
}

/// Mock API that succeeds unless told otherwise and records every call
pub struct MockAtprotoApi {
    did: String,
    fail_login: bool,
    fail_resume: bool,
    fail_upload: bool,
    fail_post: bool,
    state: Mutex<MockState>,
}

impl MockAtprotoApi {
    pub fn new(did: &str) -> Self {
        Self {
            did: did.to_string(),
            fail_login: false,
            fail_resume: false,
            fail_upload: false,
            fail_post: false,
            state: Mutex::new(MockState::default()),
        }
    }

    pub fn with_login_failure(mut self) -> Self {
        self.fail_login = true;
        self
    }

    pub fn with_resume_failure(mut self) -> Self {
        self.fail_resume = true;
        self
    }

    pub fn with_upload_failure(mut self) -> Self {
        self.fail_upload = true;
        self
    }

    pub fn with_post_failure(mut self) -> Self {
        self.fail_post = true;
        self
    }

    /// Session the mock hands out on login
    pub fn issued_session(&self) -> Session {
        Session {
            did: self.did.clone(),
            handle: "bot.test".to_string(),
            access_jwt: "mock-access".to_string(),
            refresh_jwt: "mock-refresh".to_string(),
            email: None,
            active: None,
            extra: Map::new(),
        }
    }

    pub fn login_calls(&self) -> usize {
        self.lock().login_calls
    }

    pub fn resume_calls(&self) -> usize {
        self.lock().resume_calls
    }

    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.lock().uploads.clone()
    }

    pub fn posts(&self) -> Vec<NewPost> {
        self.lock().posts.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        // Poisoned by a panicking test; keep the recorded calls readable
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl AtprotoApi for MockAtprotoApi {
    async fn login(&self, _identifier: &str, _password: &str) -> Result<Session> {
        let mut state = self.lock();
        state.login_calls += 1;
        if self.fail_login {
            return Err(SnapbackError::Auth("Invalid identifier or password".to_string()));
        }
        let session = self.issued_session();
        state.session = Some(session.clone());
        Ok(session)
    }

    async fn resume_session(&self, session: Session) -> Result<()> {
        let mut state = self.lock();
        state.resume_calls += 1;
        if self.fail_resume {
            return Err(SnapbackError::SessionResume("Token has expired".to_string()));
        }
        state.session = Some(session);
        Ok(())
    }

    async fn upload_blob(&self, bytes: Vec<u8>, encoding: &str) -> Result<BlobRef> {
        if self.fail_upload {
            return Err(SnapbackError::Upload("XRPC 500".to_string()));
        }
        let mut state = self.lock();
        let size = bytes.len() as u64;
        state.uploads.push(RecordedUpload {
            bytes,
            encoding: encoding.to_string(),
        });
        Ok(BlobRef {
            blob_type: "blob".to_string(),
            reference: BlobLink {
                link: format!("bafkmock{}", state.uploads.len()),
            },
            mime_type: encoding.to_string(),
            size,
        })
    }

    async fn post(&self, post: NewPost) -> Result<StrongRef> {
        if self.fail_post {
            return Err(SnapbackError::Api("XRPC 400 InvalidRequest".to_string()));
        }
        let mut state = self.lock();
        state.posts.push(post);
        let n = state.posts.len();
        Ok(StrongRef::for_post(&self.did, &format!("reply{}", n), &format!("bafyreply{}", n)))
    }

    async fn session_did(&self) -> Option<String> {
        self.lock().session.as_ref().map(|s| s.did.clone())
    }
}
