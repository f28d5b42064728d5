use super::{POST_COLUMNS, Storage, limit_to_i64, to_millis};
use crate::error::Result;
use crate::model::{Post, TrendingHashtag};
use chrono::{DateTime, Utc};
use rusqlite::params;
use tracing::debug;

impl Storage {
    /// Link a post to each tag in one transaction, creating missing hashtag
    /// rows. Existing links are left alone. Returns the number of new links.
    ///
    /// # Errors
    ///
    /// Returns an error if any statement fails; no link is kept in that case.
    pub fn link_hashtags(
        &mut self,
        post_id: &str,
        tags: &[String],
        at: DateTime<Utc>,
    ) -> Result<usize> {
        if tags.is_empty() {
            return Ok(0);
        }

        let tx = self.conn.transaction()?;
        let mut linked = 0;
        {
            let mut create = tx.prepare("INSERT OR IGNORE INTO hashtags (tag) VALUES (?)")?;
            let mut lookup = tx.prepare("SELECT id FROM hashtags WHERE tag = ?")?;
            let mut link = tx.prepare(
                "INSERT OR IGNORE INTO post_hashtags (post_id, hashtag_id, created_at) VALUES (?1, ?2, ?3)",
            )?;

            for tag in tags {
                create.execute(params![tag])?;
                let hashtag_id: i64 = lookup.query_row(params![tag], |row| row.get(0))?;
                linked += link.execute(params![post_id, hashtag_id, to_millis(at)])?;
            }
        }
        tx.commit()?;

        debug!(post_id, linked, "Linked hashtags");
        Ok(linked)
    }

    /// Tags linked to a post, alphabetically.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn hashtags_for_post(&self, post_id: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT h.tag FROM post_hashtags ph JOIN hashtags h ON h.id = ph.hashtag_id
            WHERE ph.post_id = ?
            ORDER BY h.tag
            ",
        )?;
        let tags = stmt
            .query_map(params![post_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(tags)
    }

    /// Posts tagged with `tag` (already normalized), newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn posts_by_hashtag(&self, tag: &str, limit: usize) -> Result<Vec<Post>> {
        self.query_posts(
            &format!(
                r"
                SELECT {POST_COLUMNS}
                FROM posts p
                JOIN users u ON u.id = p.author_id
                JOIN post_hashtags ph ON ph.post_id = p.id
                JOIN hashtags h ON h.id = ph.hashtag_id
                WHERE h.tag = ?1
                ORDER BY p.created_at DESC, p.id DESC
                LIMIT ?2
                "
            ),
            params![tag, limit_to_i64(limit)],
        )
    }

    /// Tags by number of post links created after `since`. Ties are broken
    /// alphabetically so the output is reproducible.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn trending_hashtags(
        &self,
        limit: usize,
        since: DateTime<Utc>,
    ) -> Result<Vec<TrendingHashtag>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT h.tag, COUNT(*) AS uses
            FROM post_hashtags ph JOIN hashtags h ON h.id = ph.hashtag_id
            WHERE ph.created_at > ?1
            GROUP BY h.id, h.tag
            ORDER BY uses DESC, h.tag ASC
            LIMIT ?2
            ",
        )?;
        let trending = stmt
            .query_map(params![to_millis(since), limit_to_i64(limit)], |row| {
                Ok(TrendingHashtag {
                    tag: row.get(0)?,
                    count: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(trending)
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::Storage;
    use crate::storage::tests::{create_test_post, create_test_user};
    use chrono::{Duration, Utc};

    fn tags(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_link_hashtags_is_idempotent() {
        let mut storage = Storage::open_memory().unwrap();
        let alice = create_test_user(&storage, "alice");
        let post = create_test_post(&storage, &alice, "#rust #go");

        assert_eq!(
            storage
                .link_hashtags(&post.id, &tags(&["rust", "go"]), Utc::now())
                .unwrap(),
            2
        );
        assert_eq!(
            storage
                .link_hashtags(&post.id, &tags(&["rust"]), Utc::now())
                .unwrap(),
            0
        );
        assert_eq!(storage.hashtags_for_post(&post.id).unwrap(), vec!["go", "rust"]);
    }

    #[test]
    fn test_link_hashtags_rolls_back_on_failure() {
        let mut storage = Storage::open_memory().unwrap();
        // Unknown post id violates the foreign key on the first link.
        let result = storage.link_hashtags("missing", &tags(&["rust"]), Utc::now());
        assert!(result.is_err());
        let count: i64 = storage
            .connection()
            .query_row("SELECT COUNT(*) FROM hashtags", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_posts_by_hashtag_newest_first() {
        let mut storage = Storage::open_memory().unwrap();
        let alice = create_test_user(&storage, "alice");
        let first = create_test_post(&storage, &alice, "#rust one");
        let second = create_test_post(&storage, &alice, "#rust two");
        create_test_post(&storage, &alice, "#go three");
        for p in [&first, &second] {
            storage
                .link_hashtags(&p.id, &tags(&["rust"]), p.created_at)
                .unwrap();
        }

        let posts = storage.posts_by_hashtag("rust", 10).unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].id, second.id);
        assert!(storage.posts_by_hashtag("go", 10).unwrap().is_empty());
    }

    #[test]
    fn test_trending_orders_by_count_then_tag() {
        let mut storage = Storage::open_memory().unwrap();
        let alice = create_test_user(&storage, "alice");
        let now = Utc::now();

        let p1 = create_test_post(&storage, &alice, "1");
        let p2 = create_test_post(&storage, &alice, "2");
        let p3 = create_test_post(&storage, &alice, "3");
        storage
            .link_hashtags(&p1.id, &tags(&["zeta", "beta", "alpha"]), now)
            .unwrap();
        storage
            .link_hashtags(&p2.id, &tags(&["zeta", "beta"]), now)
            .unwrap();
        storage
            .link_hashtags(&p3.id, &tags(&["old"]), now - Duration::days(30))
            .unwrap();

        let trending = storage
            .trending_hashtags(10, now - Duration::days(7))
            .unwrap();
        let order: Vec<(&str, i64)> = trending.iter().map(|t| (t.tag.as_str(), t.count)).collect();
        assert_eq!(order, vec![("beta", 2), ("zeta", 2), ("alpha", 1)]);

        assert_eq!(
            storage
                .trending_hashtags(1, now - Duration::days(7))
                .unwrap()
                .len(),
            1
        );
    }
}
