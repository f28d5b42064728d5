use super::{
    POST_COLUMNS, Storage, is_constraint_violation, like_pattern, limit_to_i64, post_from_row,
    to_millis,
};
use crate::error::{Result, TwtError};
use crate::model::Post;
use rusqlite::params;
use tracing::debug;

const POST_FROM: &str = "posts p JOIN users u ON u.id = p.author_id";

impl Storage {
    /// Insert a post, reply or retweet row.
    ///
    /// # Errors
    ///
    /// Returns [`TwtError::Conflict`] if the row violates a uniqueness or
    /// shape constraint, such as a second retweet of the same post.
    pub fn insert_post(&self, post: &Post) -> Result<()> {
        self.conn
            .execute(
                r"
                INSERT INTO posts
                (id, author_id, text, created_at, is_retweet, original_post_id, parent_post_id)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ",
                params![
                    post.id,
                    post.author_id,
                    post.text,
                    to_millis(post.created_at),
                    i32::from(post.is_retweet),
                    post.original_post_id,
                    post.parent_post_id,
                ],
            )
            .map_err(|e| {
                if is_constraint_violation(&e) {
                    TwtError::conflict(format!("Post {} conflicts with an existing post", post.id))
                } else {
                    e.into()
                }
            })?;
        debug!(post_id = %post.id, "Inserted post");
        Ok(())
    }

    /// Get a post by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_post(&self, id: &str) -> Result<Option<Post>> {
        let result = self.conn.query_row(
            &format!("SELECT {POST_COLUMNS} FROM {POST_FROM} WHERE p.id = ?"),
            params![id],
            post_from_row,
        );

        match result {
            Ok(post) => Ok(Some(post)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a post if `author_id` wrote it. Returns false if nothing matched.
    ///
    /// Likes, hashtag links, mentions, media rows and retweets go with it;
    /// replies keep existing with their parent link cleared.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn delete_post(&self, id: &str, author_id: &str) -> Result<bool> {
        let affected = self.conn.execute(
            "DELETE FROM posts WHERE id = ?1 AND author_id = ?2",
            params![id, author_id],
        )?;
        Ok(affected > 0)
    }

    /// Posts by `user_id` and everyone they follow, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn feed(&self, user_id: &str, limit: usize, offset: usize) -> Result<Vec<Post>> {
        self.query_posts(
            &format!(
                r"
                SELECT {POST_COLUMNS} FROM {POST_FROM}
                WHERE p.author_id = ?1
                   OR p.author_id IN (SELECT followee_id FROM follows WHERE follower_id = ?1)
                ORDER BY p.created_at DESC, p.id DESC
                LIMIT ?2 OFFSET ?3
                "
            ),
            params![user_id, limit_to_i64(limit), limit_to_i64(offset)],
        )
    }

    /// A user's own posts, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn posts_by_author(&self, author_id: &str, limit: usize) -> Result<Vec<Post>> {
        self.query_posts(
            &format!(
                r"
                SELECT {POST_COLUMNS} FROM {POST_FROM}
                WHERE p.author_id = ?1
                ORDER BY p.created_at DESC, p.id DESC
                LIMIT ?2
                "
            ),
            params![author_id, limit_to_i64(limit)],
        )
    }

    /// Direct replies to a post, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn replies_to(&self, parent_id: &str) -> Result<Vec<Post>> {
        self.query_posts(
            &format!(
                r"
                SELECT {POST_COLUMNS} FROM {POST_FROM}
                WHERE p.parent_post_id = ?1
                ORDER BY p.created_at ASC, p.id ASC
                "
            ),
            params![parent_id],
        )
    }

    /// Posts whose text contains `query`, newest first.
    ///
    /// Matching is case-insensitive for ASCII letters only (`SQLite` LIKE);
    /// `%` and `_` in the query match literally.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn search_posts(&self, query: &str, limit: usize) -> Result<Vec<Post>> {
        self.query_posts(
            &format!(
                r"
                SELECT {POST_COLUMNS} FROM {POST_FROM}
                WHERE p.text LIKE ?1 ESCAPE '\'
                ORDER BY p.created_at DESC, p.id DESC
                LIMIT ?2
                "
            ),
            params![like_pattern(query), limit_to_i64(limit)],
        )
    }

    /// True if `user_id` has already retweeted `original_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn has_retweeted(&self, user_id: &str, original_id: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM posts WHERE author_id = ?1 AND original_post_id = ?2 AND is_retweet = 1",
            params![user_id, original_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Number of retweets of a post.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn retweet_count(&self, post_id: &str) -> Result<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM posts WHERE original_post_id = ? AND is_retweet = 1",
            params![post_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Number of direct replies to a post.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn reply_count(&self, post_id: &str) -> Result<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM posts WHERE parent_post_id = ?",
            params![post_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub(crate) fn query_posts(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<Post>> {
        let mut stmt = self.conn.prepare(sql)?;
        let posts = stmt
            .query_map(params, post_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(posts)
    }
}
