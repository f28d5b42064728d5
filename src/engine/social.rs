//! Follows, likes, blocks and retweets.

use super::Engine;
use crate::error::{Result, TwtError};
use crate::ids;
use crate::model::{FollowCounts, NotificationKind, Post, PostDetails, User};
use crate::session::Session;
use chrono::Utc;
use tracing::info;

impl Engine<'_> {
    // =========================================================================
    // Follows
    // =========================================================================

    /// Follow `username` and notify them.
    ///
    /// # Errors
    ///
    /// Returns [`TwtError::SelfReference`] when following yourself and
    /// [`TwtError::Conflict`] if already following.
    pub fn follow(&self, session: &Session, username: &str) -> Result<User> {
        let target = self.user(username)?;
        if target.id == session.user_id() {
            return Err(TwtError::self_reference("follow"));
        }

        self.storage
            .insert_follow(session.user_id(), &target.id, Utc::now())?;
        info!(follower = session.username(), followee = %target.username, "Followed user");
        self.notify_or_log(session, &target.id, NotificationKind::Follow, None);
        Ok(target)
    }

    /// # Errors
    ///
    /// Returns [`TwtError::NotFound`] if the session user does not follow
    /// `username`.
    pub fn unfollow(&self, session: &Session, username: &str) -> Result<User> {
        let target = self.user(username)?;
        if !self.storage.delete_follow(session.user_id(), &target.id)? {
            return Err(TwtError::not_found("Follow", format!("@{}", target.username)));
        }
        info!(follower = session.username(), followee = %target.username, "Unfollowed user");
        Ok(target)
    }

    /// Users following `username`, alphabetically.
    ///
    /// # Errors
    ///
    /// Returns [`TwtError::UserNotFound`] for an unknown name.
    pub fn followers(&self, username: &str) -> Result<Vec<User>> {
        let user = self.user(username)?;
        self.storage.followers(&user.id)
    }

    /// Users `username` follows, alphabetically.
    ///
    /// # Errors
    ///
    /// Returns [`TwtError::UserNotFound`] for an unknown name.
    pub fn following(&self, username: &str) -> Result<Vec<User>> {
        let user = self.user(username)?;
        self.storage.following(&user.id)
    }

    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn follow_counts(&self, user: &User) -> Result<FollowCounts> {
        self.storage.follow_counts(&user.id)
    }

    // =========================================================================
    // Likes
    // =========================================================================

    /// Like a post and notify its author.
    ///
    /// # Errors
    ///
    /// Returns [`TwtError::NotFound`] for a missing post and
    /// [`TwtError::Conflict`] if already liked.
    pub fn like(&self, session: &Session, post_id: &str) -> Result<Post> {
        let post = self.post(post_id)?;
        self.storage
            .insert_like(session.user_id(), &post.id, Utc::now())?;
        info!(user = session.username(), post_id = %post.id, "Liked post");
        self.notify_or_log(session, &post.author_id, NotificationKind::Like, Some(&post.id));
        Ok(post)
    }

    /// # Errors
    ///
    /// Returns [`TwtError::NotFound`] if the post was not liked.
    pub fn unlike(&self, session: &Session, post_id: &str) -> Result<()> {
        if !self.storage.delete_like(session.user_id(), post_id)? {
            return Err(TwtError::not_found("Like", post_id));
        }
        info!(user = session.username(), post_id, "Unliked post");
        Ok(())
    }

    /// Users who liked a post.
    ///
    /// # Errors
    ///
    /// Returns [`TwtError::NotFound`] for a missing post.
    pub fn likers(&self, post_id: &str) -> Result<Vec<User>> {
        let post = self.post(post_id)?;
        self.storage.likers(&post.id)
    }

    // =========================================================================
    // Blocks
    // =========================================================================

    /// Block `username`. Blocking twice is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`TwtError::SelfReference`] when blocking yourself.
    pub fn block(&self, session: &Session, username: &str) -> Result<User> {
        let target = self.user(username)?;
        if target.id == session.user_id() {
            return Err(TwtError::self_reference("block"));
        }

        let created = self
            .storage
            .insert_block(session.user_id(), &target.id, Utc::now())?;
        info!(blocker = session.username(), blocked = %target.username, created, "Blocked user");
        Ok(target)
    }

    /// # Errors
    ///
    /// Returns [`TwtError::NotFound`] if `username` was not blocked.
    pub fn unblock(&self, session: &Session, username: &str) -> Result<User> {
        let target = self.user(username)?;
        if !self.storage.delete_block(session.user_id(), &target.id)? {
            return Err(TwtError::not_found("Block", format!("@{}", target.username)));
        }
        info!(blocker = session.username(), blocked = %target.username, "Unblocked user");
        Ok(target)
    }

    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn blocked_users(&self, session: &Session) -> Result<Vec<User>> {
        self.storage.blocked_users(session.user_id())
    }

    // =========================================================================
    // Retweets
    // =========================================================================

    /// Retweet a post. A retweet of a retweet points at the original.
    ///
    /// # Errors
    ///
    /// Returns [`TwtError::NotFound`] for a missing post,
    /// [`TwtError::Conflict`] if already retweeted and
    /// [`TwtError::SelfReference`] for the user's own post.
    pub fn retweet(&self, session: &Session, post_id: &str) -> Result<Post> {
        let mut original = self.post(post_id)?;
        if let Some(source_id) = original.original_post_id.clone() {
            original = self.post(&source_id)?;
        }

        if self.storage.has_retweeted(session.user_id(), &original.id)? {
            return Err(TwtError::conflict("You already retweeted this post"));
        }
        if original.author_id == session.user_id() {
            return Err(TwtError::self_reference("retweet"));
        }

        let id = ids::next_id();
        let retweet = Post {
            id: id.to_string(),
            author_id: session.user_id().to_string(),
            author_username: session.username().to_string(),
            text: original.text.clone(),
            created_at: ids::timestamp_of(id),
            is_retweet: true,
            original_post_id: Some(original.id.clone()),
            parent_post_id: None,
        };
        self.storage.insert_post(&retweet).map_err(|e| match e {
            TwtError::Conflict { .. } => TwtError::conflict("You already retweeted this post"),
            other => other,
        })?;
        info!(user = session.username(), original = %original.id, "Retweeted post");

        self.notify_or_log(
            session,
            &original.author_id,
            NotificationKind::Retweet,
            Some(&original.id),
        );
        Ok(retweet)
    }

    /// A post with its counters and attachments.
    ///
    /// # Errors
    ///
    /// Returns [`TwtError::NotFound`] for a missing post.
    pub fn post_details(&self, post_id: &str) -> Result<PostDetails> {
        let post = self.post(post_id)?;
        Ok(PostDetails {
            like_count: self.storage.like_count(&post.id)?,
            retweet_count: self.storage.retweet_count(&post.id)?,
            reply_count: self.storage.reply_count(&post.id)?,
            media: self.storage.media_for_post(&post.id)?,
            post,
        })
    }
}
