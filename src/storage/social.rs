//! Follow, like and block edges.

use super::{Storage, is_constraint_violation, to_millis, user_from_row};
use crate::error::{Result, TwtError};
use crate::model::{FollowCounts, User};
use chrono::{DateTime, Utc};
use rusqlite::params;

impl Storage {
    // =========================================================================
    // Follows
    // =========================================================================

    /// Insert a follow edge.
    ///
    /// # Errors
    ///
    /// Returns [`TwtError::Conflict`] if the edge exists.
    pub fn insert_follow(
        &self,
        follower_id: &str,
        followee_id: &str,
        at: DateTime<Utc>,
    ) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO follows (follower_id, followee_id, created_at) VALUES (?1, ?2, ?3)",
                params![follower_id, followee_id, to_millis(at)],
            )
            .map_err(|e| {
                if is_constraint_violation(&e) {
                    TwtError::conflict("Already following this user")
                } else {
                    e.into()
                }
            })?;
        Ok(())
    }

    /// Remove a follow edge. Returns false if there was none.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn delete_follow(&self, follower_id: &str, followee_id: &str) -> Result<bool> {
        let affected = self.conn.execute(
            "DELETE FROM follows WHERE follower_id = ?1 AND followee_id = ?2",
            params![follower_id, followee_id],
        )?;
        Ok(affected > 0)
    }

    /// Users following `user_id`, by username.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn followers(&self, user_id: &str) -> Result<Vec<User>> {
        self.query_users(
            r"
            SELECT u.id, u.username, u.created_at
            FROM follows f JOIN users u ON u.id = f.follower_id
            WHERE f.followee_id = ?
            ORDER BY u.username
            ",
            user_id,
        )
    }

    /// Users `user_id` follows, by username.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn following(&self, user_id: &str) -> Result<Vec<User>> {
        self.query_users(
            r"
            SELECT u.id, u.username, u.created_at
            FROM follows f JOIN users u ON u.id = f.followee_id
            WHERE f.follower_id = ?
            ORDER BY u.username
            ",
            user_id,
        )
    }

    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn follow_counts(&self, user_id: &str) -> Result<FollowCounts> {
        let counts = self.conn.query_row(
            r"
            SELECT
                (SELECT COUNT(*) FROM follows WHERE followee_id = ?1),
                (SELECT COUNT(*) FROM follows WHERE follower_id = ?1)
            ",
            params![user_id],
            |row| {
                Ok(FollowCounts {
                    followers: row.get(0)?,
                    following: row.get(1)?,
                })
            },
        )?;
        Ok(counts)
    }

    // =========================================================================
    // Likes
    // =========================================================================

    /// Insert a like edge.
    ///
    /// # Errors
    ///
    /// Returns [`TwtError::Conflict`] if the post is already liked.
    pub fn insert_like(&self, user_id: &str, post_id: &str, at: DateTime<Utc>) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO likes (user_id, post_id, created_at) VALUES (?1, ?2, ?3)",
                params![user_id, post_id, to_millis(at)],
            )
            .map_err(|e| {
                if is_constraint_violation(&e) {
                    TwtError::conflict("You already liked this post")
                } else {
                    e.into()
                }
            })?;
        Ok(())
    }

    /// Remove a like edge. Returns false if there was none.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn delete_like(&self, user_id: &str, post_id: &str) -> Result<bool> {
        let affected = self.conn.execute(
            "DELETE FROM likes WHERE user_id = ?1 AND post_id = ?2",
            params![user_id, post_id],
        )?;
        Ok(affected > 0)
    }

    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn has_liked(&self, user_id: &str, post_id: &str) -> Result<bool> {
        self.edge_exists(
            "SELECT COUNT(*) FROM likes WHERE user_id = ?1 AND post_id = ?2",
            user_id,
            post_id,
        )
    }

    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn like_count(&self, post_id: &str) -> Result<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM likes WHERE post_id = ?",
            params![post_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Users who liked a post, most recent like first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn likers(&self, post_id: &str) -> Result<Vec<User>> {
        self.query_users(
            r"
            SELECT u.id, u.username, u.created_at
            FROM likes l JOIN users u ON u.id = l.user_id
            WHERE l.post_id = ?
            ORDER BY l.created_at DESC, u.username
            ",
            post_id,
        )
    }

    // =========================================================================
    // Blocks
    // =========================================================================

    /// Insert a block edge, ignoring duplicates. Returns true if it was new.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn insert_block(&self, blocker_id: &str, blocked_id: &str, at: DateTime<Utc>) -> Result<bool> {
        let affected = self.conn.execute(
            "INSERT OR IGNORE INTO blocks (blocker_id, blocked_id, created_at) VALUES (?1, ?2, ?3)",
            params![blocker_id, blocked_id, to_millis(at)],
        )?;
        Ok(affected > 0)
    }

    /// Remove a block edge. Returns false if there was none.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn delete_block(&self, blocker_id: &str, blocked_id: &str) -> Result<bool> {
        let affected = self.conn.execute(
            "DELETE FROM blocks WHERE blocker_id = ?1 AND blocked_id = ?2",
            params![blocker_id, blocked_id],
        )?;
        Ok(affected > 0)
    }

    /// True if `blocker_id` has blocked `blocked_id`. Direction matters.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn is_blocked(&self, blocker_id: &str, blocked_id: &str) -> Result<bool> {
        self.edge_exists(
            "SELECT COUNT(*) FROM blocks WHERE blocker_id = ?1 AND blocked_id = ?2",
            blocker_id,
            blocked_id,
        )
    }

    /// Users `blocker_id` has blocked, by username.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn blocked_users(&self, blocker_id: &str) -> Result<Vec<User>> {
        self.query_users(
            r"
            SELECT u.id, u.username, u.created_at
            FROM blocks b JOIN users u ON u.id = b.blocked_id
            WHERE b.blocker_id = ?
            ORDER BY u.username
            ",
            blocker_id,
        )
    }

    fn edge_exists(&self, sql: &str, a: &str, b: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(sql, params![a, b], |row| row.get(0))?;
        Ok(count > 0)
    }

    fn query_users(&self, sql: &str, id: &str) -> Result<Vec<User>> {
        let mut stmt = self.conn.prepare(sql)?;
        let users = stmt
            .query_map(params![id], user_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::TwtError;
    use crate::storage::Storage;
    use crate::storage::tests::{create_test_post, create_test_user};
    use chrono::Utc;

    #[test]
    fn test_follow_edges() {
        let storage = Storage::open_memory().unwrap();
        let alice = create_test_user(&storage, "alice");
        let bob = create_test_user(&storage, "bob");
        let carol = create_test_user(&storage, "carol");

        storage.insert_follow(&alice.id, &bob.id, Utc::now()).unwrap();
        storage.insert_follow(&carol.id, &bob.id, Utc::now()).unwrap();
        assert!(matches!(
            storage.insert_follow(&alice.id, &bob.id, Utc::now()),
            Err(TwtError::Conflict { .. })
        ));

        assert_eq!(storage.following(&alice.id).unwrap().len(), 1);
        assert!(storage.following(&bob.id).unwrap().is_empty());

        let names: Vec<String> = storage
            .followers(&bob.id)
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        assert_eq!(names, vec!["alice", "carol"]);
        assert_eq!(storage.following(&alice.id).unwrap()[0].username, "bob");

        let counts = storage.follow_counts(&bob.id).unwrap();
        assert_eq!((counts.followers, counts.following), (2, 0));

        assert!(storage.delete_follow(&alice.id, &bob.id).unwrap());
        assert!(!storage.delete_follow(&alice.id, &bob.id).unwrap());
    }

    #[test]
    fn test_self_follow_rejected_by_schema() {
        let storage = Storage::open_memory().unwrap();
        let alice = create_test_user(&storage, "alice");
        assert!(storage.insert_follow(&alice.id, &alice.id, Utc::now()).is_err());
    }

    #[test]
    fn test_like_edges() {
        let storage = Storage::open_memory().unwrap();
        let alice = create_test_user(&storage, "alice");
        let bob = create_test_user(&storage, "bob");
        let post = create_test_post(&storage, &alice, "like me");

        storage.insert_like(&bob.id, &post.id, Utc::now()).unwrap();
        assert!(storage.insert_like(&bob.id, &post.id, Utc::now()).is_err());
        assert!(storage.has_liked(&bob.id, &post.id).unwrap());
        assert_eq!(storage.like_count(&post.id).unwrap(), 1);
        assert_eq!(storage.likers(&post.id).unwrap()[0].username, "bob");

        assert!(storage.delete_like(&bob.id, &post.id).unwrap());
        assert!(!storage.delete_like(&bob.id, &post.id).unwrap());
        assert_eq!(storage.like_count(&post.id).unwrap(), 0);
    }

    #[test]
    fn test_block_is_idempotent_and_directed() {
        let storage = Storage::open_memory().unwrap();
        let alice = create_test_user(&storage, "alice");
        let bob = create_test_user(&storage, "bob");

        assert!(storage.insert_block(&alice.id, &bob.id, Utc::now()).unwrap());
        assert!(!storage.insert_block(&alice.id, &bob.id, Utc::now()).unwrap());
        assert!(storage.is_blocked(&alice.id, &bob.id).unwrap());
        assert!(!storage.is_blocked(&bob.id, &alice.id).unwrap());
        assert_eq!(storage.blocked_users(&alice.id).unwrap().len(), 1);

        assert!(storage.delete_block(&alice.id, &bob.id).unwrap());
        assert!(!storage.delete_block(&alice.id, &bob.id).unwrap());
    }
}
