//! Feeds, threads, search and hashtag views.

use super::Engine;
use crate::error::{Result, TwtError};
use crate::model::{Post, Profile, ThreadEntry, TrendingHashtag};
use crate::session::Session;
use crate::text::normalize_tag;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Longest ancestor chain a thread view will walk.
pub const MAX_THREAD_DEPTH: usize = 100;

/// Window used by `twt trending` when no `--days` is given.
pub const DEFAULT_TRENDING_DAYS: i64 = 7;

impl Engine<'_> {
    /// Posts by the session user and everyone they follow, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn feed(&self, session: &Session, limit: usize, offset: usize) -> Result<Vec<Post>> {
        let posts = self.storage.feed(session.user_id(), limit, offset)?;
        debug!(user = session.username(), limit, offset, returned = posts.len(), "Built feed");
        Ok(posts)
    }

    /// A post in context: its ancestors (nearest last), the post itself and
    /// its direct replies oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`TwtError::NotFound`] if the post does not exist.
    pub fn thread(&self, post_id: &str) -> Result<Vec<ThreadEntry>> {
        let focus = self.post(post_id)?;

        let mut seen = HashSet::from([focus.id.clone()]);
        let mut ancestors = Vec::new();
        let mut next = focus.parent_post_id.clone();
        while let Some(parent_id) = next {
            if ancestors.len() >= MAX_THREAD_DEPTH {
                warn!(post_id = %focus.id, "Thread deeper than {MAX_THREAD_DEPTH}, truncating");
                break;
            }
            if !seen.insert(parent_id.clone()) {
                warn!(post_id = %focus.id, %parent_id, "Cycle in reply chain");
                break;
            }
            let Some(parent) = self.storage.get_post(&parent_id)? else {
                break;
            };
            next = parent.parent_post_id.clone();
            ancestors.push(parent);
        }

        let replies = self.storage.replies_to(&focus.id)?;
        let depth = i32::try_from(ancestors.len()).unwrap_or(i32::MAX);
        let mut entries: Vec<ThreadEntry> = ancestors
            .into_iter()
            .rev()
            .zip(-depth..)
            .map(|(post, level)| ThreadEntry { level, post })
            .collect();

        entries.push(ThreadEntry {
            level: 0,
            post: focus,
        });
        entries.extend(replies.into_iter().map(|post| ThreadEntry { level: 1, post }));
        Ok(entries)
    }

    /// # Errors
    ///
    /// Returns [`TwtError::Validation`] for a blank query.
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<Post>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(TwtError::validation("search query cannot be empty"));
        }
        self.storage.search_posts(query, limit)
    }

    /// Posts tagged with `tag`; a leading `#` and letter case are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`TwtError::Validation`] for a blank tag.
    pub fn posts_by_hashtag(&self, tag: &str, limit: usize) -> Result<Vec<Post>> {
        let tag = normalize_tag(tag);
        if tag.is_empty() {
            return Err(TwtError::validation("hashtag cannot be empty"));
        }
        self.storage.posts_by_hashtag(&tag, limit)
    }

    /// Posts mentioning the session user, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn mentions(&self, session: &Session, limit: usize) -> Result<Vec<Post>> {
        self.storage.mentions_of(session.user_id(), limit)
    }

    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn trending_hashtags(
        &self,
        limit: usize,
        since: DateTime<Utc>,
    ) -> Result<Vec<TrendingHashtag>> {
        self.storage.trending_hashtags(limit, since)
    }

    /// A user with counters and their latest `limit` posts.
    ///
    /// # Errors
    ///
    /// Returns [`TwtError::UserNotFound`] for an unknown name.
    pub fn profile(&self, username: &str, limit: usize) -> Result<Profile> {
        let user = self.user(username)?;
        Ok(Profile {
            counts: self.storage.follow_counts(&user.id)?,
            post_count: self.storage.post_count(&user.id)?,
            posts: self.storage.posts_by_author(&user.id, limit)?,
            user,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::PublishRequest;
    use crate::engine::tests::{Fixture, signup};
    use crate::error::TwtError;
    use chrono::{Duration, Utc};

    #[test]
    fn test_thread_levels_and_order() {
        let mut fx = Fixture::new();
        let mut engine = fx.engine();
        let alice = signup(&engine, "alice");
        let bob = signup(&engine, "bob");

        let root = engine.publish_post(&alice, PublishRequest::new("root")).unwrap().post;
        let middle = engine
            .publish_post(&bob, PublishRequest::reply(&root.id, "middle"))
            .unwrap()
            .post;
        let r1 = engine
            .publish_post(&alice, PublishRequest::reply(&middle.id, "r1"))
            .unwrap()
            .post;
        let r2 = engine
            .publish_post(&bob, PublishRequest::reply(&middle.id, "r2"))
            .unwrap()
            .post;

        let thread = engine.thread(&middle.id).unwrap();
        let shape: Vec<(i32, &str)> = thread
            .iter()
            .map(|e| (e.level, e.post.id.as_str()))
            .collect();
        assert_eq!(
            shape,
            vec![
                (-1, root.id.as_str()),
                (0, middle.id.as_str()),
                (1, r1.id.as_str()),
                (1, r2.id.as_str()),
            ]
        );

        let deep = engine.thread(&r1.id).unwrap();
        let levels: Vec<i32> = deep.iter().map(|e| e.level).collect();
        assert_eq!(levels, vec![-2, -1, 0]);
        assert_eq!(deep[0].post.id, root.id);

        assert!(matches!(engine.thread("nope"), Err(TwtError::NotFound { .. })));
    }

    #[test]
    fn test_thread_survives_deleted_parent() {
        let mut fx = Fixture::new();
        let mut engine = fx.engine();
        let alice = signup(&engine, "alice");
        let root = engine.publish_post(&alice, PublishRequest::new("root")).unwrap().post;
        let reply = engine
            .publish_post(&alice, PublishRequest::reply(&root.id, "child"))
            .unwrap()
            .post;

        engine.delete_post(&alice, &root.id).unwrap();
        let thread = engine.thread(&reply.id).unwrap();
        assert_eq!(thread.len(), 1);
        assert_eq!(thread[0].level, 0);
    }

    #[test]
    fn test_feed_respects_follows_and_pages() {
        let mut fx = Fixture::new();
        let mut engine = fx.engine();
        let alice = signup(&engine, "alice");
        let bob = signup(&engine, "bob");
        let carol = signup(&engine, "carol");
        engine.follow(&alice, "bob").unwrap();

        for i in 0..3 {
            engine
                .publish_post(&bob, PublishRequest::new(format!("bob {i}")))
                .unwrap();
        }
        engine.publish_post(&carol, PublishRequest::new("carol")).unwrap();
        engine.publish_post(&alice, PublishRequest::new("alice")).unwrap();

        let page1 = engine.feed(&alice, 2, 0).unwrap();
        let page2 = engine.feed(&alice, 2, 2).unwrap();
        assert_eq!(page1.len(), 2);
        assert!(page1[0].created_at >= page1[1].created_at);
        assert!(page1[0].id > page1[1].id);
        assert!(page2.iter().all(|p| page1.iter().all(|q| q.id != p.id)));
        let all = engine.feed(&alice, 50, 0).unwrap();
        assert_eq!(all.len(), 4);
        assert!(all.iter().all(|p| p.author_username != "carol"));
    }

    #[test]
    fn test_hashtag_mentions_and_trending() {
        let mut fx = Fixture::new();
        let mut engine = fx.engine();
        let alice = signup(&engine, "alice");
        let bob = signup(&engine, "bob");

        engine
            .publish_post(&alice, PublishRequest::new("#beta #alpha hi @bob"))
            .unwrap();
        engine.publish_post(&bob, PublishRequest::new("#Alpha again")).unwrap();
        engine.publish_post(&bob, PublishRequest::new("#beta too")).unwrap();

        assert_eq!(engine.posts_by_hashtag("#ALPHA", 10).unwrap().len(), 2);
        assert!(matches!(
            engine.posts_by_hashtag("#", 10),
            Err(TwtError::Validation { .. })
        ));
        assert_eq!(engine.mentions(&bob, 10).unwrap().len(), 1);

        let since = Utc::now() - Duration::days(7);
        let trending = engine.trending_hashtags(10, since).unwrap();
        let tags: Vec<(&str, i64)> = trending.iter().map(|t| (t.tag.as_str(), t.count)).collect();
        assert_eq!(tags, vec![("alpha", 2), ("beta", 2)]);
    }

    #[test]
    fn test_search_and_profile() {
        let mut fx = Fixture::new();
        let mut engine = fx.engine();
        let alice = signup(&engine, "alice");
        engine
            .publish_post(&alice, PublishRequest::new("Rust is fun"))
            .unwrap();
        engine.publish_post(&alice, PublishRequest::new("so is Go")).unwrap();

        assert_eq!(engine.search("RUST", 10).unwrap().len(), 1);
        assert!(matches!(
            engine.search("  ", 10),
            Err(TwtError::Validation { .. })
        ));

        let profile = engine.profile("@alice", 1).unwrap();
        assert_eq!(profile.post_count, 2);
        assert_eq!(profile.posts.len(), 1);
        assert_eq!(profile.posts[0].text, "so is Go");
    }
}
