//! Jetstream wire format

use serde::Deserialize;
use serde_json::Value;
use snapback_core::{MentionEvent, PostRecord, Result};

/// One frame from the Jetstream websocket
#[derive(Debug, Clone, Deserialize)]
pub struct JetstreamEvent {
    /// Repo the event belongs to
    pub did: String,
    /// Server timestamp, usable as a resume cursor
    pub time_us: i64,
    /// `commit`, `identity` or `account`
    pub kind: String,
    #[serde(default)]
    pub commit: Option<CommitData>,
}

/// Commit payload of a `kind == "commit"` event
#[derive(Debug, Clone, Deserialize)]
pub struct CommitData {
    #[serde(default)]
    pub rev: Option<String>,
    /// `create`, `update` or `delete`
    pub operation: String,
    pub collection: String,
    pub rkey: String,
    #[serde(default)]
    pub record: Option<Value>,
    #[serde(default)]
    pub cid: Option<String>,
}

impl JetstreamEvent {
    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Convert to a post-creation event if this is a create in `collection`
    pub fn into_post_created(self, collection: &str) -> Option<MentionEvent> {
        if self.kind != "commit" {
            return None;
        }
        let commit = self.commit?;
        if commit.operation != "create" || commit.collection != collection {
            return None;
        }

        let cid = commit.cid?;
        let record: PostRecord = match serde_json::from_value(commit.record?) {
            Ok(record) => record,
            Err(e) => {
                tracing::debug!("Skipping unparsable record {}/{}: {}", self.did, commit.rkey, e);
                return None;
            }
        };

        Some(MentionEvent {
            author_did: self.did,
            rkey: commit.rkey,
            cid,
            record,
            time_us: Some(self.time_us),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapback_core::POST_COLLECTION;

    const CREATE_FRAME: &str = r#"{
        "did": "did:plc:author",
        "time_us": 1725911162329308,
        "kind": "commit",
        "commit": {
            "rev": "3l3qo2vutsw2b",
            "operation": "create",
            "collection": "app.bsky.feed.post",
            "rkey": "3l3qo2vuowo2b",
            "record": {
                "$type": "app.bsky.feed.post",
                "createdAt": "2024-09-09T19:46:02.102Z",
                "langs": ["en"],
                "text": "hello @bot.test",
                "facets": [{
                    "index": { "byteStart": 6, "byteEnd": 15 },
                    "features": [{ "$type": "app.bsky.richtext.facet#mention", "did": "did:plc:bot" }]
                }]
            },
            "cid": "bafyreidwaivazkwu67xztlmuobx35hs2lnfh3kolmgfmucldvhd3sgzcqi"
        }
    }"#;

    #[test]
    fn test_create_commit_becomes_event() {
        let event = JetstreamEvent::parse(CREATE_FRAME)
            .unwrap()
            .into_post_created(POST_COLLECTION)
            .unwrap();

        assert_eq!(event.author_did, "did:plc:author");
        assert_eq!(event.rkey, "3l3qo2vuowo2b");
        assert_eq!(event.time_us, Some(1725911162329308));
        assert_eq!(event.record.text, "hello @bot.test");
        assert!(event.record.facets.is_some());
    }

    #[test]
    fn test_mention_with_partial_index_still_arrives() {
        let frame = r#"{"did":"did:plc:a","time_us":3,"kind":"commit",
            "commit":{"operation":"create","collection":"app.bsky.feed.post","rkey":"k","cid":"c",
            "record":{"$type":"app.bsky.feed.post","text":"@bot",
                "reply":{"root":{"uri":"at://did:plc:op/app.bsky.feed.post/r","cid":"cr"},"parent":{}},
                "facets":[{"index":{"byteStart":0},
                    "features":[{"$type":"app.bsky.richtext.facet#mention","did":"did:plc:bot"}]}]}}}"#;

        let event = JetstreamEvent::parse(frame)
            .unwrap()
            .into_post_created(POST_COLLECTION)
            .expect("post with a partial facet index must not be dropped");

        let facets = event.record.facets.as_deref().unwrap();
        assert!(facets[0].index.is_none());
        assert!(facets[0].features[0].mentions("did:plc:bot"));
        assert_eq!(event.record.reply.unwrap().root.cid, "cr");
    }

    #[test]
    fn test_delete_commit_is_dropped() {
        let frame = r#"{"did":"did:plc:a","time_us":1,"kind":"commit",
            "commit":{"rev":"x","operation":"delete","collection":"app.bsky.feed.post","rkey":"k"}}"#;
        let event = JetstreamEvent::parse(frame).unwrap();
        assert!(event.into_post_created(POST_COLLECTION).is_none());
    }

    #[test]
    fn test_other_collection_is_dropped() {
        let frame = r#"{"did":"did:plc:a","time_us":1,"kind":"commit",
            "commit":{"operation":"create","collection":"app.bsky.feed.like","rkey":"k",
            "record":{"$type":"app.bsky.feed.like"},"cid":"c"}}"#;
        let event = JetstreamEvent::parse(frame).unwrap();
        assert!(event.into_post_created(POST_COLLECTION).is_none());
    }

    #[test]
    fn test_identity_event_is_dropped() {
        let frame = r#"{"did":"did:plc:a","time_us":2,"kind":"identity",
            "identity":{"did":"did:plc:a","handle":"a.test","seq":1,"time":"2024-09-09T19:46:02Z"}}"#;
        let event = JetstreamEvent::parse(frame).unwrap();
        assert_eq!(event.time_us, 2);
        assert!(event.into_post_created(POST_COLLECTION).is_none());
    }

    #[test]
    fn test_garbage_frame_is_an_error() {
        assert!(JetstreamEvent::parse("not json").is_err());
    }
}
