//! Post publication, deletion and account creation.

use super::Engine;
use crate::error::{Result, TwtError};
use crate::ids;
use crate::media::{ImageInfo, MAX_IMAGES_PER_POST, inspect_image};
use crate::model::{Media, NotificationKind, Post, User};
use crate::session::Session;
use crate::text::{extract_hashtags, extract_mentions};
use crate::validation::{validate_post_text, validate_username};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Input to [`Engine::publish_post`].
#[derive(Debug, Clone, Default)]
pub struct PublishRequest {
    pub text: String,
    pub images: Vec<PathBuf>,
    pub parent_post_id: Option<String>,
}

impl PublishRequest {
    /// A top-level post without attachments.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// A reply to `parent_post_id`.
    pub fn reply(parent_post_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            images: Vec::new(),
            parent_post_id: Some(parent_post_id.into()),
        }
    }

    #[must_use]
    pub fn with_images(mut self, images: Vec<PathBuf>) -> Self {
        self.images = images;
        self
    }
}

/// What a publication produced.
///
/// `hashtags` and `mentions` hold what was actually linked; mentions of
/// unknown users are dropped. `warnings` lists side effects that failed
/// after the post was committed.
#[derive(Debug, Clone, Serialize)]
pub struct PublishOutcome {
    pub post: Post,
    pub hashtags: Vec<String>,
    pub mentions: Vec<String>,
    pub media: Vec<Media>,
    pub warnings: Vec<String>,
}

/// A deleted post and the attachments that went with it.
#[derive(Debug, Clone, Serialize)]
pub struct DeletedPost {
    pub post: Post,
    pub media: Vec<Media>,
    pub warnings: Vec<String>,
}

impl Engine<'_> {
    /// Create a local account.
    ///
    /// # Errors
    ///
    /// Returns [`TwtError::Validation`] for a malformed name and
    /// [`TwtError::Conflict`] if it is taken.
    pub fn create_user(&self, username: &str) -> Result<User> {
        let username = validate_username(username)?;
        let id = ids::next_id();
        let user = User {
            id: id.to_string(),
            username,
            created_at: ids::timestamp_of(id),
        };
        self.storage.insert_user(&user)?;
        info!(user_id = %user.id, username = %user.username, "Created user");
        Ok(user)
    }

    /// Publish a post, reply or post with images.
    ///
    /// Validation runs before anything is written. Once the post row exists,
    /// attachment, hashtag, mention and notification failures are collected
    /// as warnings and the post stays.
    ///
    /// # Errors
    ///
    /// Returns [`TwtError::Validation`] for bad text,
    /// [`TwtError::InvalidAttachment`] for too many or unusable images and
    /// [`TwtError::NotFound`] if the parent post does not exist.
    pub fn publish_post(
        &mut self,
        session: &Session,
        request: PublishRequest,
    ) -> Result<PublishOutcome> {
        let text = validate_post_text(&request.text)?;

        if let Some(extra) = request.images.get(MAX_IMAGES_PER_POST) {
            return Err(TwtError::invalid_attachment(
                extra,
                format!(
                    "a post can have at most {MAX_IMAGES_PER_POST} images, got {}",
                    request.images.len()
                ),
            ));
        }
        let images = request
            .images
            .iter()
            .map(|path| inspect_image(path))
            .collect::<Result<Vec<_>>>()?;

        let parent = request
            .parent_post_id
            .as_deref()
            .map(|id| self.post(id))
            .transpose()?;

        let id = ids::next_id();
        let post = Post {
            id: id.to_string(),
            author_id: session.user_id().to_string(),
            author_username: session.username().to_string(),
            text,
            created_at: ids::timestamp_of(id),
            is_retweet: false,
            original_post_id: None,
            parent_post_id: parent.as_ref().map(|p| p.id.clone()),
        };
        self.storage.insert_post(&post)?;
        info!(post_id = %post.id, author = session.username(), reply = post.is_reply(), "Published post");

        let mut warnings = Vec::new();
        let media = self.attach_images(&post, &images, &mut warnings);
        let hashtags = self.link_hashtags(&post, &mut warnings);
        let mentioned = self.link_mentions(&post, &mut warnings);

        for user in &mentioned {
            warnings.extend(self.notify_best_effort(
                session,
                &user.id,
                NotificationKind::Mention,
                Some(&post.id),
            ));
        }

        if let Some(parent) = &parent {
            let already_notified = mentioned.iter().any(|u| u.id == parent.author_id);
            if !already_notified {
                warnings.extend(self.notify_best_effort(
                    session,
                    &parent.author_id,
                    NotificationKind::Reply,
                    Some(&post.id),
                ));
            }
        }

        Ok(PublishOutcome {
            post,
            hashtags,
            mentions: mentioned.into_iter().map(|u| u.username).collect(),
            media,
            warnings,
        })
    }

    /// Delete one of the session user's posts.
    ///
    /// # Errors
    ///
    /// Returns [`TwtError::NotOwned`] if the post does not exist or was
    /// written by someone else.
    pub fn delete_post(&self, session: &Session, post_id: &str) -> Result<DeletedPost> {
        let post = self
            .storage
            .get_post(post_id)?
            .filter(|p| p.author_id == session.user_id())
            .ok_or_else(|| TwtError::not_owned("Post", post_id))?;
        let media = self.storage.media_for_post(&post.id)?;

        if !self.storage.delete_post(&post.id, session.user_id())? {
            return Err(TwtError::not_owned("Post", post_id));
        }
        info!(post_id = %post.id, "Deleted post");

        let mut warnings = Vec::new();
        for item in &media {
            if let Err(e) = self.attachments.remove(Path::new(&item.file_path)) {
                warn!(path = %item.file_path, error = %e, "Failed to remove attachment");
                warnings.push(format!("could not remove {}: {e}", item.file_name));
            }
        }

        Ok(DeletedPost {
            post,
            media,
            warnings,
        })
    }

    fn attach_images(
        &self,
        post: &Post,
        images: &[ImageInfo],
        warnings: &mut Vec<String>,
    ) -> Vec<Media> {
        let mut attached = Vec::with_capacity(images.len());

        for (index, image) in images.iter().enumerate() {
            let Ok(position) = u8::try_from(index) else {
                break;
            };
            match self.attach_image(post, image, position) {
                Ok(media) => attached.push(media),
                Err(e) => {
                    warn!(post_id = %post.id, source = %image.source.display(), error = %e, "Failed to attach image");
                    warnings.push(format!(
                        "could not attach {}: {e}",
                        image.source.display()
                    ));
                }
            }
        }

        attached
    }

    fn attach_image(&self, post: &Post, image: &ImageInfo, position: u8) -> Result<Media> {
        let stored = self.attachments.store(image, &post.id, position)?;
        let id = ids::next_id();
        let media = Media {
            id: id.to_string(),
            post_id: post.id.clone(),
            file_path: stored.file_path.to_string_lossy().into_owned(),
            file_name: stored.file_name,
            file_type: image.mime_type.to_string(),
            file_size: i64::try_from(image.size).unwrap_or(i64::MAX),
            width: Some(image.width),
            height: Some(image.height),
            position,
            created_at: ids::timestamp_of(id),
        };

        if let Err(e) = self.storage.insert_media(&media) {
            // Row failed, so the copied file would be orphaned.
            if let Err(cleanup) = self.attachments.remove(&stored.file_path) {
                warn!(path = %stored.file_path.display(), error = %cleanup, "Failed to remove orphaned attachment");
            }
            return Err(e);
        }
        Ok(media)
    }

    fn link_hashtags(&mut self, post: &Post, warnings: &mut Vec<String>) -> Vec<String> {
        let tags = extract_hashtags(&post.text);
        match self.storage.link_hashtags(&post.id, &tags, post.created_at) {
            Ok(_) => tags,
            Err(e) => {
                warn!(post_id = %post.id, error = %e, "Failed to link hashtags");
                warnings.push(format!("could not record hashtags: {e}"));
                Vec::new()
            }
        }
    }

    /// Resolve `@names` to existing users and record the mention edges.
    /// Returns the users that were recorded.
    fn link_mentions(&mut self, post: &Post, warnings: &mut Vec<String>) -> Vec<User> {
        let mut users = Vec::new();
        for name in extract_mentions(&post.text) {
            match self.storage.get_user_by_username(&name) {
                Ok(Some(user)) => users.push(user),
                Ok(None) => debug!(username = %name, "Ignoring mention of unknown user"),
                Err(e) => {
                    warn!(username = %name, error = %e, "Failed to resolve mention");
                    warnings.push(format!("could not resolve @{name}: {e}"));
                }
            }
        }

        let user_ids: Vec<String> = users.iter().map(|u| u.id.clone()).collect();
        match self.storage.insert_mentions(&post.id, &user_ids, post.created_at) {
            Ok(_) => users,
            Err(e) => {
                warn!(post_id = %post.id, error = %e, "Failed to record mentions");
                warnings.push(format!("could not record mentions: {e}"));
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::tests::{Fixture, signup};
    use crate::media::tests::write_png;
    use crate::model::NotificationKind;

    fn kinds(engine: &Engine<'_>, session: &Session) -> Vec<NotificationKind> {
        engine
            .storage()
            .notifications_for(session.user_id(), false, 50)
            .unwrap()
            .into_iter()
            .map(|n| n.notification.kind)
            .collect()
    }

    #[test]
    fn test_publish_trims_and_extracts() {
        let mut fx = Fixture::new();
        let mut engine = fx.engine();
        let alice = signup(&engine, "alice");
        let bob = signup(&engine, "bob");

        let out = engine
            .publish_post(
                &alice,
                PublishRequest::new("  Hello #Rust and #rust @Bob @ghost  "),
            )
            .unwrap();

        assert_eq!(out.post.text, "Hello #Rust and #rust @Bob @ghost");
        assert_eq!(out.hashtags, vec!["rust"]);
        assert_eq!(out.mentions, vec!["bob"]);
        assert!(out.warnings.is_empty());
        assert_eq!(kinds(&engine, &bob), vec![NotificationKind::Mention]);
        assert_eq!(
            engine.storage().hashtags_for_post(&out.post.id).unwrap(),
            vec!["rust"]
        );
    }

    #[test]
    fn test_publish_rejects_bad_text_before_writing() {
        let mut fx = Fixture::new();
        let mut engine = fx.engine();
        let alice = signup(&engine, "alice");

        for text in ["   ", &"x".repeat(281)] {
            let err = engine
                .publish_post(&alice, PublishRequest::new(text))
                .unwrap_err();
            assert!(matches!(err, TwtError::Validation { .. }));
        }
        assert_eq!(engine.storage().post_count(alice.user_id()).unwrap(), 0);

        // 280 multi-byte characters still fit.
        let long = "é".repeat(280);
        assert!(engine.publish_post(&alice, PublishRequest::new(long)).is_ok());
    }

    #[test]
    fn test_self_mention_links_without_notifying() {
        let mut fx = Fixture::new();
        let mut engine = fx.engine();
        let alice = signup(&engine, "alice");

        let out = engine
            .publish_post(&alice, PublishRequest::new("note to @alice"))
            .unwrap();
        assert_eq!(out.mentions, vec!["alice"]);
        assert!(kinds(&engine, &alice).is_empty());
    }

    #[test]
    fn test_reply_notifies_parent_author_once() {
        let mut fx = Fixture::new();
        let mut engine = fx.engine();
        let alice = signup(&engine, "alice");
        let bob = signup(&engine, "bob");
        let root = engine
            .publish_post(&alice, PublishRequest::new("root"))
            .unwrap()
            .post;

        engine
            .publish_post(&bob, PublishRequest::reply(&root.id, "plain reply"))
            .unwrap();
        engine
            .publish_post(&bob, PublishRequest::reply(&root.id, "hey @alice"))
            .unwrap();
        engine
            .publish_post(&alice, PublishRequest::reply(&root.id, "self reply"))
            .unwrap();

        assert_eq!(
            kinds(&engine, &alice),
            vec![NotificationKind::Mention, NotificationKind::Reply]
        );
    }

    #[test]
    fn test_reply_to_missing_parent() {
        let mut fx = Fixture::new();
        let mut engine = fx.engine();
        let alice = signup(&engine, "alice");
        let err = engine
            .publish_post(&alice, PublishRequest::reply("nope", "hello"))
            .unwrap_err();
        assert!(matches!(err, TwtError::NotFound { .. }));
    }

    #[test]
    fn test_publish_with_images_and_delete() {
        let mut fx = Fixture::new();
        let first = fx.scratch().join("a.png");
        let second = fx.scratch().join("b.png");
        write_png(&first, 3, 2);
        write_png(&second, 1, 1);

        let mut engine = fx.engine();
        let alice = signup(&engine, "alice");
        let out = engine
            .publish_post(
                &alice,
                PublishRequest::new("pics").with_images(vec![first, second]),
            )
            .unwrap();

        assert_eq!(out.media.len(), 2);
        assert_eq!(out.media[0].position, 0);
        assert_eq!((out.media[0].width, out.media[0].height), (Some(3), Some(2)));
        assert!(Path::new(&out.media[1].file_path).exists());

        let deleted = engine.delete_post(&alice, &out.post.id).unwrap();
        assert_eq!(deleted.media.len(), 2);
        assert!(deleted.warnings.is_empty());
        assert!(!Path::new(&out.media[0].file_path).exists());
        assert!(engine.storage().media_for_post(&out.post.id).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_or_too_many_images_write_nothing() {
        let mut fx = Fixture::new();
        let bad = fx.scratch().join("bad.gif");
        std::fs::write(&bad, b"GIF? no").unwrap();
        let good = fx.scratch().join("good.png");
        write_png(&good, 1, 1);
        let fifth = fx.scratch().join("fifth.png");

        let mut engine = fx.engine();
        let alice = signup(&engine, "alice");

        let err = engine
            .publish_post(&alice, PublishRequest::new("x").with_images(vec![bad]))
            .unwrap_err();
        assert!(matches!(err, TwtError::InvalidAttachment { .. }));

        let mut five = vec![good; 4];
        five.push(fifth.clone());
        let err = engine
            .publish_post(&alice, PublishRequest::new("x").with_images(five))
            .unwrap_err();
        match err {
            TwtError::InvalidAttachment { path, reason } => {
                assert_eq!(path, fifth);
                assert!(reason.contains("at most 4"));
            }
            other => panic!("expected InvalidAttachment, got {other:?}"),
        }
        assert_eq!(engine.storage().post_count(alice.user_id()).unwrap(), 0);
    }

    #[test]
    fn test_delete_requires_ownership() {
        let mut fx = Fixture::new();
        let mut engine = fx.engine();
        let alice = signup(&engine, "alice");
        let bob = signup(&engine, "bob");
        let post = engine
            .publish_post(&alice, PublishRequest::new("mine"))
            .unwrap()
            .post;

        assert!(matches!(
            engine.delete_post(&bob, &post.id),
            Err(TwtError::NotOwned { .. })
        ));
        assert!(matches!(
            engine.delete_post(&alice, "missing"),
            Err(TwtError::NotOwned { .. })
        ));
        assert!(engine.delete_post(&alice, &post.id).is_ok());
    }

    #[test]
    fn test_create_user_rules() {
        let mut fx = Fixture::new();
        let engine = fx.engine();
        let user = engine.create_user("  @Alice_1 ").unwrap();
        assert_eq!(user.username, "alice_1");
        assert!(matches!(
            engine.create_user("ALICE_1"),
            Err(TwtError::Conflict { .. })
        ));
        assert!(matches!(
            engine.create_user("no"),
            Err(TwtError::Validation { .. })
        ));
    }
}
