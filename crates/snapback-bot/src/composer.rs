//! Image replies to mentions
//!
//! One reply pipeline per mention:
//! 1. Load the manifest and pick the next image
//! 2. Upload its bytes
//! 3. Post an empty-text reply embedding the image, threaded under the mention
//!
//! A failure anywhere drops the mention. Nothing is retried.

use crate::library::ImageLibrary;
use crate::rotator::ImageRotator;
use snapback_atproto::AtprotoApi;
use snapback_core::{ImagesEmbed, MentionEvent, NewPost, ReplyRef, Result, StrongRef};
use std::sync::Arc;
use tracing::{error, info};

/// Thread pointers for a reply to `event`
///
/// The parent is always the mentioning post. The root is carried over when
/// the mention is itself a reply, otherwise the mention starts the thread.
pub fn reply_ref_for(event: &MentionEvent) -> ReplyRef {
    let parent = event.post_ref();
    let root = event
        .record
        .reply
        .as_ref()
        .map(|reply| reply.root.clone())
        .unwrap_or_else(|| parent.clone());
    ReplyRef { root, parent }
}

/// Builds and sends image replies
pub struct ReplyComposer {
    api: Arc<dyn AtprotoApi>,
    library: ImageLibrary,
    rotator: ImageRotator,
}

impl ReplyComposer {
    pub fn new(api: Arc<dyn AtprotoApi>, library: ImageLibrary) -> Self {
        Self {
            api,
            library,
            rotator: ImageRotator::new(),
        }
    }

    /// Reply to `event`, logging instead of returning any failure
    pub async fn reply_to(&self, event: &MentionEvent) -> Option<StrongRef> {
        match self.try_reply(event).await {
            Ok(created) => Some(created),
            Err(e) => {
                error!("Error posting image reply to {}: {}", event.web_url(), e);
                None
            }
        }
    }

    /// Reply to `event`, surfacing the first failure
    pub async fn try_reply(&self, event: &MentionEvent) -> Result<StrongRef> {
        let images = self.library.load_manifest().await?;
        let image = self.rotator.next(&images)?;
        let bytes = self.library.read_image(image).await?;
        let encoding = self.library.encoding_for(image);

        let blob = self.api.upload_blob(bytes, &encoding).await?;

        let post = NewPost::new("")
            .with_reply(reply_ref_for(event))
            .with_embed(ImagesEmbed::single(blob, &image.alt));
        let created = self.api.post(post).await?;

        info!("Posted reply with image: {}", image.path);
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapback_atproto::MockAtprotoApi;
    use snapback_core::{PostRecord, SnapbackError, StrongRef, ThreadRef, POST_COLLECTION};
    use tempfile::TempDir;

    fn mention(reply: Option<ThreadRef>) -> MentionEvent {
        MentionEvent {
            author_did: "did:plc:author".to_string(),
            rkey: "3kmention".to_string(),
            cid: "bafymention".to_string(),
            record: PostRecord {
                record_type: POST_COLLECTION.to_string(),
                reply,
                ..Default::default()
            },
            time_us: None,
        }
    }

    fn image_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("images.json"),
            r#"[{"path":"one.png","alt":"first"},{"path":"two.jpg","alt":"second"}]"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("one.png"), b"png-bytes").unwrap();
        std::fs::write(dir.path().join("two.jpg"), b"jpg-bytes").unwrap();
        dir
    }

    #[test]
    fn test_top_level_mention_is_its_own_root() {
        let event = mention(None);
        let reply = reply_ref_for(&event);
        let own = StrongRef::for_post("did:plc:author", "3kmention", "bafymention");
        assert_eq!(reply.parent, own);
        assert_eq!(reply.root, own);
    }

    #[test]
    fn test_reply_mention_keeps_existing_root() {
        let root = StrongRef::for_post("did:plc:op", "3kroot", "bafyroot");
        let event = mention(Some(ThreadRef {
            root: root.clone(),
            parent: Some(StrongRef::for_post("did:plc:mid", "3kmid", "bafymid")),
        }));

        let reply = reply_ref_for(&event);
        assert_eq!(reply.root, root);
        assert_eq!(reply.parent.uri, "at://did:plc:author/app.bsky.feed.post/3kmention");
    }

    #[test]
    fn test_reply_mention_without_parent_keeps_root() {
        let root = StrongRef::for_post("did:plc:op", "3kroot", "bafyroot");
        let event = mention(Some(ThreadRef {
            root: root.clone(),
            parent: None,
        }));

        let reply = reply_ref_for(&event);
        assert_eq!(reply.root, root);
        assert_eq!(reply.parent, event.post_ref());
    }

    #[tokio::test]
    async fn test_reply_uploads_and_posts() {
        let dir = image_dir();
        let api = Arc::new(MockAtprotoApi::new("did:plc:bot"));
        let composer = ReplyComposer::new(api.clone(), ImageLibrary::new(dir.path(), "images.json"));

        let created = composer.reply_to(&mention(None)).await;
        assert!(created.is_some());

        let uploads = api.uploads();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].bytes, b"png-bytes");
        assert_eq!(uploads[0].encoding, "image/png");

        let posts = api.posts();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].text, "");
        let embed = posts[0].embed.as_ref().unwrap();
        assert_eq!(embed.images.len(), 1);
        assert_eq!(embed.images[0].alt, "first");
        assert_eq!(embed.images[0].image.reference.link, "bafkmock1");
    }

    #[tokio::test]
    async fn test_consecutive_replies_rotate_images() {
        let dir = image_dir();
        let api = Arc::new(MockAtprotoApi::new("did:plc:bot"));
        let composer = ReplyComposer::new(api.clone(), ImageLibrary::new(dir.path(), "images.json"));

        for _ in 0..3 {
            composer.reply_to(&mention(None)).await.unwrap();
        }

        let alts: Vec<String> = api
            .posts()
            .iter()
            .map(|p| p.embed.as_ref().unwrap().images[0].alt.clone())
            .collect();
        assert_eq!(alts, vec!["first", "second", "first"]);
        assert_eq!(api.uploads()[1].encoding, "image/jpeg");
    }

    #[tokio::test]
    async fn test_missing_manifest_drops_mention() {
        let dir = TempDir::new().unwrap();
        let api = Arc::new(MockAtprotoApi::new("did:plc:bot"));
        let composer = ReplyComposer::new(api.clone(), ImageLibrary::new(dir.path(), "images.json"));

        let result = composer.try_reply(&mention(None)).await;
        assert!(matches!(result, Err(SnapbackError::ResourceUnavailable(_))));
        assert!(composer.reply_to(&mention(None)).await.is_none());
        assert!(api.uploads().is_empty());
        assert!(api.posts().is_empty());
    }

    #[tokio::test]
    async fn test_missing_image_file_drops_mention() {
        let dir = image_dir();
        std::fs::remove_file(dir.path().join("one.png")).unwrap();
        let api = Arc::new(MockAtprotoApi::new("did:plc:bot"));
        let composer = ReplyComposer::new(api.clone(), ImageLibrary::new(dir.path(), "images.json"));

        assert!(composer.reply_to(&mention(None)).await.is_none());
        assert!(api.uploads().is_empty());
    }

    #[tokio::test]
    async fn test_upload_failure_skips_post() {
        let dir = image_dir();
        let api = Arc::new(MockAtprotoApi::new("did:plc:bot").with_upload_failure());
        let composer = ReplyComposer::new(api.clone(), ImageLibrary::new(dir.path(), "images.json"));

        let result = composer.try_reply(&mention(None)).await;
        assert!(matches!(result, Err(SnapbackError::Upload(_))));
        assert!(api.posts().is_empty());
    }

    #[tokio::test]
    async fn test_post_failure_is_swallowed() {
        let dir = image_dir();
        let api = Arc::new(MockAtprotoApi::new("did:plc:bot").with_post_failure());
        let composer = ReplyComposer::new(api.clone(), ImageLibrary::new(dir.path(), "images.json"));

        assert!(composer.reply_to(&mention(None)).await.is_none());
        assert_eq!(api.uploads().len(), 1);
    }
}
