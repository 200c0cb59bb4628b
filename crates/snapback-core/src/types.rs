//! Core type definitions for snapback
//!
//! These mirror the AT Protocol lexicon shapes the bot reads from the firehose
//! and writes back through XRPC. Only the fields the bot touches are modeled;
//! everything else is ignored on input.

use chrono::{SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Collection NSID for posts
pub const POST_COLLECTION: &str = "app.bsky.feed.post";

/// Facet feature type for account mentions
pub const MENTION_FEATURE: &str = "app.bsky.richtext.facet#mention";

/// Embed type for image attachments
pub const IMAGES_EMBED: &str = "app.bsky.embed.images";

/// One entry of the image manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDescriptor {
    /// File location, relative to the images directory
    pub path: String,
    /// Accessibility text attached to the embed
    pub alt: String,
}

/// Reference to a specific version of a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrongRef {
    pub uri: String,
    pub cid: String,
}

impl StrongRef {
    /// Build the reference for a post from its author, record key and cid
    pub fn for_post(did: &str, rkey: &str, cid: &str) -> Self {
        Self {
            uri: format!("at://{}/{}/{}", did, POST_COLLECTION, rkey),
            cid: cid.to_string(),
        }
    }
}

/// Thread pointers carried by a reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyRef {
    /// First post of the thread
    pub root: StrongRef,
    /// Post being answered
    pub parent: StrongRef,
}

/// Thread pointers found on an incoming post
///
/// Only `root` is needed to answer; `parent` may be missing or malformed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadRef {
    pub root: StrongRef,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub parent: Option<StrongRef>,
}

/// Byte range a facet applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ByteSlice {
    pub byte_start: usize,
    pub byte_end: usize,
}

/// Rich-text annotation on a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facet {
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub index: Option<ByteSlice>,
    #[serde(default)]
    pub features: Vec<FacetFeature>,
}

/// A single feature of a facet (mention, link, tag)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetFeature {
    #[serde(rename = "$type", default)]
    pub feature_type: String,
    /// Mentioned account, present on mention features
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub did: Option<String>,
}

impl FacetFeature {
    pub fn mention(did: &str) -> Self {
        Self {
            feature_type: MENTION_FEATURE.to_string(),
            did: Some(did.to_string()),
        }
    }

    /// Whether this feature mentions the given account
    pub fn mentions(&self, did: &str) -> bool {
        self.feature_type == MENTION_FEATURE && self.did.as_deref() == Some(did)
    }
}

/// A post record as delivered by the firehose
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    #[serde(rename = "$type", default)]
    pub record_type: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facets: Option<Vec<Facet>>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub reply: Option<ThreadRef>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub created_at: Option<String>,
}

/// Deserialize an optional field, treating a malformed value as absent
///
/// Firehose records come from arbitrary clients; a broken optional field
/// never discards the whole post.
fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// A post-creation event that may mention the bot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentionEvent {
    /// Author of the post
    pub author_did: String,
    /// Record key of the post within the author's repo
    pub rkey: String,
    /// Content hash of the post record
    pub cid: String,
    pub record: PostRecord,
    /// Firehose cursor position of the event (microseconds)
    pub time_us: Option<i64>,
}

impl MentionEvent {
    /// Strong reference to the post itself
    pub fn post_ref(&self) -> StrongRef {
        StrongRef::for_post(&self.author_did, &self.rkey, &self.cid)
    }

    /// Public web link, for logging
    pub fn web_url(&self) -> String {
        format!(
            "https://bsky.app/profile/{}/post/{}",
            self.author_did, self.rkey
        )
    }
}

/// Inner link of an uploaded blob
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobLink {
    #[serde(rename = "$link")]
    pub link: String,
}

/// Handle to an uploaded binary payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobRef {
    #[serde(rename = "$type", default = "default_blob_type")]
    pub blob_type: String,
    #[serde(rename = "ref")]
    pub reference: BlobLink,
    pub mime_type: String,
    pub size: u64,
}

fn default_blob_type() -> String {
    "blob".to_string()
}

/// One image inside an images embed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedImage {
    pub alt: String,
    pub image: BlobRef,
}

/// `app.bsky.embed.images` payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagesEmbed {
    #[serde(rename = "$type")]
    pub embed_type: String,
    pub images: Vec<EmbedImage>,
}

impl ImagesEmbed {
    pub fn single(image: BlobRef, alt: &str) -> Self {
        Self {
            embed_type: IMAGES_EMBED.to_string(),
            images: vec![EmbedImage {
                alt: alt.to_string(),
                image,
            }],
        }
    }
}

/// A post record the bot is about to create
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    #[serde(rename = "$type")]
    pub record_type: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<ReplyRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embed: Option<ImagesEmbed>,
    pub created_at: String,
}

impl NewPost {
    /// Plain post stamped with the current time
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            record_type: POST_COLLECTION.to_string(),
            text: text.into(),
            reply: None,
            embed: None,
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    pub fn with_reply(mut self, reply: ReplyRef) -> Self {
        self.reply = Some(reply);
        self
    }

    pub fn with_embed(mut self, embed: ImagesEmbed) -> Self {
        self.embed = Some(embed);
        self
    }
}

/// Authenticated session as returned by `com.atproto.server.createSession`
///
/// Fields the bot does not use are kept in `extra` so a save/load cycle
/// reproduces what the server sent.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub did: String,
    pub handle: String,
    pub access_jwt: String,
    pub refresh_jwt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Session {
    /// Apply the tokens from a refresh response, keeping everything else
    pub fn refreshed(mut self, access_jwt: String, refresh_jwt: String) -> Self {
        self.access_jwt = access_jwt;
        self.refresh_jwt = refresh_jwt;
        self
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("did", &self.did)
            .field("handle", &self.handle)
            .field("access_jwt", &"<redacted>")
            .field("refresh_jwt", &"<redacted>")
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}
