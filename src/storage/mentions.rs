use super::{POST_COLUMNS, Storage, limit_to_i64, to_millis};
use crate::error::Result;
use crate::model::Post;
use chrono::{DateTime, Utc};
use rusqlite::params;
use tracing::debug;

impl Storage {
    /// Record that a post mentions each of `user_ids`, in one transaction.
    /// Existing edges are left alone. Returns the number of new edges.
    ///
    /// # Errors
    ///
    /// Returns an error if any insert fails; no edge is kept in that case.
    pub fn insert_mentions(
        &mut self,
        post_id: &str,
        user_ids: &[String],
        at: DateTime<Utc>,
    ) -> Result<usize> {
        if user_ids.is_empty() {
            return Ok(0);
        }

        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO mentions (post_id, mentioned_user_id, created_at) VALUES (?1, ?2, ?3)",
            )?;
            for user_id in user_ids {
                inserted += stmt.execute(params![post_id, user_id, to_millis(at)])?;
            }
        }
        tx.commit()?;

        debug!(post_id, inserted, "Recorded mentions");
        Ok(inserted)
    }

    /// Posts mentioning `user_id`, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn mentions_of(&self, user_id: &str, limit: usize) -> Result<Vec<Post>> {
        self.query_posts(
            &format!(
                r"
                SELECT {POST_COLUMNS}
                FROM posts p
                JOIN users u ON u.id = p.author_id
                JOIN mentions mn ON mn.post_id = p.id
                WHERE mn.mentioned_user_id = ?1
                ORDER BY p.created_at DESC, p.id DESC
                LIMIT ?2
                "
            ),
            params![user_id, limit_to_i64(limit)],
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::Storage;
    use crate::storage::tests::{create_test_post, create_test_user};
    use chrono::Utc;

    #[test]
    fn test_mentions_are_unique_per_post() {
        let mut storage = Storage::open_memory().unwrap();
        let alice = create_test_user(&storage, "alice");
        let bob = create_test_user(&storage, "bob");
        let post = create_test_post(&storage, &alice, "hi @bob");

        let ids = vec![bob.id.clone(), bob.id.clone()];
        assert_eq!(storage.insert_mentions(&post.id, &ids, Utc::now()).unwrap(), 1);

        let mentions = storage.mentions_of(&bob.id, 10).unwrap();
        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].id, post.id);
        assert!(storage.mentions_of(&alice.id, 10).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_user_rolls_back_all_mentions() {
        let mut storage = Storage::open_memory().unwrap();
        let alice = create_test_user(&storage, "alice");
        let bob = create_test_user(&storage, "bob");
        let post = create_test_post(&storage, &alice, "hi");

        let ids = vec![bob.id.clone(), "ghost".to_string()];
        assert!(storage.insert_mentions(&post.id, &ids, Utc::now()).is_err());
        assert!(storage.mentions_of(&bob.id, 10).unwrap().is_empty());
    }
}
