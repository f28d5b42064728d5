//! `SQLite` storage for the social graph.
//!
//! One [`Storage`] wraps one connection. Each entity's queries live in their
//! own file as an `impl Storage` block; none of them contain cross-entity
//! rules, which belong to the engine.

mod hashtags;
mod media;
mod mentions;
mod messages;
mod notifications;
mod posts;
mod social;
mod users;

use crate::error::{Result, TwtError};
use crate::model::{Message, Post, User};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, ErrorCode, Row, params};
use std::path::Path;
use std::time::Duration;
use tracing::info;

const SCHEMA_VERSION: i32 = 1;

/// How long a writer waits for another process's lock before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Column list matching [`post_from_row`]. Expects `posts p JOIN users u`.
pub(crate) const POST_COLUMNS: &str = "p.id, p.author_id, u.username, p.text, p.created_at, \
     p.is_retweet, p.original_post_id, p.parent_post_id";

/// Column list matching [`message_from_row`]. Expects `messages m` joined to
/// `users s` (sender) and `users r` (receiver).
pub(crate) const MESSAGE_COLUMNS: &str = "m.id, m.sender_id, s.username, m.receiver_id, \
     r.username, m.text, m.created_at, m.read";

pub(crate) const MESSAGE_JOINS: &str =
    "messages m JOIN users s ON s.id = m.sender_id JOIN users r ON r.id = m.receiver_id";

/// `SQLite` storage manager
pub struct Storage {
    conn: Connection,
}

impl Storage {
    /// Open or create the database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let path = db_path.as_ref();
        let conn = Connection::open(path).map_err(|e| {
            TwtError::with_context(format!("Failed to open database at {}", path.display()), e)
        })?;

        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
            ",
        )?;

        let storage = Self { conn };
        storage.migrate()?;
        Ok(storage)
    }

    /// Open an in-memory database (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be initialized.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
            ",
        )?;
        let storage = Self { conn };
        storage.migrate()?;
        Ok(storage)
    }

    /// Get a reference to the underlying database connection.
    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }

    fn migrate(&self) -> Result<()> {
        let current_version = self.schema_version();

        if current_version < SCHEMA_VERSION {
            info!(
                "Migrating database from version {} to {}",
                current_version, SCHEMA_VERSION
            );
            self.create_schema()?;
            self.set_schema_version(SCHEMA_VERSION)?;
        }

        Ok(())
    }

    /// Schema version recorded in the `meta` table, 0 for a fresh database.
    #[must_use]
    pub fn schema_version(&self) -> i32 {
        let result: rusqlite::Result<i32> = self.conn.query_row(
            "SELECT value FROM meta WHERE key = 'schema_version'",
            [],
            |row| {
                let value: String = row.get(0)?;
                Ok(value.parse().unwrap_or(0))
            },
        );

        // Treat missing schema table as version 0.
        result.unwrap_or_default()
    }

    fn set_schema_version(&self, version: i32) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES ('schema_version', ?)",
            params![version.to_string()],
        )?;
        Ok(())
    }

    #[allow(clippy::too_many_lines)]
    fn create_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT NOT NULL UNIQUE COLLATE NOCASE,
                created_at INTEGER NOT NULL
            );

            -- A post is an original, a reply (parent_post_id) or a retweet
            -- (is_retweet + original_post_id), never both of the last two.
            CREATE TABLE IF NOT EXISTS posts (
                id TEXT PRIMARY KEY,
                author_id TEXT NOT NULL REFERENCES users(id),
                text TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                is_retweet INTEGER NOT NULL DEFAULT 0 CHECK (is_retweet IN (0, 1)),
                original_post_id TEXT REFERENCES posts(id) ON DELETE CASCADE,
                parent_post_id TEXT REFERENCES posts(id) ON DELETE SET NULL,
                CHECK ((is_retweet = 1) = (original_post_id IS NOT NULL)),
                CHECK (NOT (is_retweet = 1 AND parent_post_id IS NOT NULL))
            );
            CREATE INDEX IF NOT EXISTS idx_posts_author ON posts(author_id, created_at);
            CREATE INDEX IF NOT EXISTS idx_posts_parent ON posts(parent_post_id);
            CREATE INDEX IF NOT EXISTS idx_posts_created ON posts(created_at);
            CREATE UNIQUE INDEX IF NOT EXISTS idx_posts_one_retweet
                ON posts(author_id, original_post_id) WHERE is_retweet = 1;

            CREATE TABLE IF NOT EXISTS follows (
                follower_id TEXT NOT NULL REFERENCES users(id),
                followee_id TEXT NOT NULL REFERENCES users(id),
                created_at INTEGER NOT NULL,
                PRIMARY KEY (follower_id, followee_id),
                CHECK (follower_id <> followee_id)
            );
            CREATE INDEX IF NOT EXISTS idx_follows_followee ON follows(followee_id);

            CREATE TABLE IF NOT EXISTS likes (
                user_id TEXT NOT NULL REFERENCES users(id),
                post_id TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                created_at INTEGER NOT NULL,
                PRIMARY KEY (user_id, post_id)
            );
            CREATE INDEX IF NOT EXISTS idx_likes_post ON likes(post_id);

            CREATE TABLE IF NOT EXISTS blocks (
                blocker_id TEXT NOT NULL REFERENCES users(id),
                blocked_id TEXT NOT NULL REFERENCES users(id),
                created_at INTEGER NOT NULL,
                PRIMARY KEY (blocker_id, blocked_id),
                CHECK (blocker_id <> blocked_id)
            );

            CREATE TABLE IF NOT EXISTS hashtags (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                tag TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS post_hashtags (
                post_id TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                hashtag_id INTEGER NOT NULL REFERENCES hashtags(id),
                created_at INTEGER NOT NULL,
                PRIMARY KEY (post_id, hashtag_id)
            );
            CREATE INDEX IF NOT EXISTS idx_post_hashtags_tag ON post_hashtags(hashtag_id);
            CREATE INDEX IF NOT EXISTS idx_post_hashtags_created ON post_hashtags(created_at);

            CREATE TABLE IF NOT EXISTS mentions (
                post_id TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                mentioned_user_id TEXT NOT NULL REFERENCES users(id),
                created_at INTEGER NOT NULL,
                PRIMARY KEY (post_id, mentioned_user_id)
            );
            CREATE INDEX IF NOT EXISTS idx_mentions_user ON mentions(mentioned_user_id);

            -- target_id points at a post or a message depending on kind, so it
            -- has no foreign key; readers LEFT JOIN and tolerate deleted targets.
            CREATE TABLE IF NOT EXISTS notifications (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES users(id),
                actor_id TEXT NOT NULL REFERENCES users(id),
                kind TEXT NOT NULL
                    CHECK (kind IN ('like', 'retweet', 'follow', 'reply', 'mention', 'message')),
                target_id TEXT,
                created_at INTEGER NOT NULL,
                read INTEGER NOT NULL DEFAULT 0,
                CHECK (user_id <> actor_id)
            );
            CREATE INDEX IF NOT EXISTS idx_notifications_user
                ON notifications(user_id, read, created_at);

            CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                sender_id TEXT NOT NULL REFERENCES users(id),
                receiver_id TEXT NOT NULL REFERENCES users(id),
                text TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                read INTEGER NOT NULL DEFAULT 0,
                CHECK (sender_id <> receiver_id)
            );
            CREATE INDEX IF NOT EXISTS idx_messages_receiver
                ON messages(receiver_id, sender_id, read);
            CREATE INDEX IF NOT EXISTS idx_messages_sender ON messages(sender_id, receiver_id);

            CREATE TABLE IF NOT EXISTS media (
                id TEXT PRIMARY KEY,
                post_id TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                file_path TEXT NOT NULL,
                file_name TEXT NOT NULL,
                file_type TEXT NOT NULL,
                file_size INTEGER NOT NULL,
                width INTEGER,
                height INTEGER,
                position INTEGER NOT NULL CHECK (position BETWEEN 0 AND 3),
                created_at INTEGER NOT NULL,
                UNIQUE (post_id, position)
            );
            ",
        )?;
        Ok(())
    }
}

pub(crate) fn to_millis(dt: DateTime<Utc>) -> i64 {
    dt.timestamp_millis()
}

pub(crate) fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

pub(crate) fn limit_to_i64(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

/// True for UNIQUE, PRIMARY KEY and CHECK violations.
pub(crate) fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

/// Escape `%`, `_` and `\` so `query` matches literally inside a LIKE pattern
/// written with `ESCAPE '\'`.
pub(crate) fn like_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

pub(crate) fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        created_at: from_millis(row.get(2)?),
    })
}

pub(crate) fn post_from_row(row: &Row<'_>) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        author_id: row.get(1)?,
        author_username: row.get(2)?,
        text: row.get(3)?,
        created_at: from_millis(row.get(4)?),
        is_retweet: row.get::<_, i32>(5)? != 0,
        original_post_id: row.get(6)?,
        parent_post_id: row.get(7)?,
    })
}

pub(crate) fn message_from_row(row: &Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: row.get(0)?,
        sender_id: row.get(1)?,
        sender_username: row.get(2)?,
        receiver_id: row.get(3)?,
        receiver_username: row.get(4)?,
        text: row.get(5)?,
        created_at: from_millis(row.get(6)?),
        read: row.get::<_, i32>(7)? != 0,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ids;

    pub(crate) fn create_test_user(storage: &Storage, username: &str) -> User {
        let id = ids::next_id();
        let user = User {
            id: id.to_string(),
            username: username.to_string(),
            created_at: ids::timestamp_of(id),
        };
        storage.insert_user(&user).unwrap();
        user
    }

    pub(crate) fn create_test_post(storage: &Storage, author: &User, text: &str) -> Post {
        let id = ids::next_id();
        let post = Post {
            id: id.to_string(),
            author_id: author.id.clone(),
            author_username: author.username.clone(),
            text: text.to_string(),
            created_at: ids::timestamp_of(id),
            is_retweet: false,
            original_post_id: None,
            parent_post_id: None,
        };
        storage.insert_post(&post).unwrap();
        post
    }

    pub(crate) fn create_test_reply(
        storage: &Storage,
        author: &User,
        parent: &Post,
        text: &str,
    ) -> Post {
        let id = ids::next_id();
        let post = Post {
            id: id.to_string(),
            author_id: author.id.clone(),
            author_username: author.username.clone(),
            text: text.to_string(),
            created_at: ids::timestamp_of(id),
            is_retweet: false,
            original_post_id: None,
            parent_post_id: Some(parent.id.clone()),
        };
        storage.insert_post(&post).unwrap();
        post
    }

    #[test]
    fn test_create_database() {
        let storage = Storage::open_memory().unwrap();
        assert_eq!(storage.schema_version(), SCHEMA_VERSION);
    }

    #[test]
    fn test_open_file_database_twice() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("twt.db");
        {
            let storage = Storage::open(&path).unwrap();
            create_test_user(&storage, "alice");
        }
        let storage = Storage::open(&path).unwrap();
        assert_eq!(storage.schema_version(), SCHEMA_VERSION);
        assert!(storage.get_user_by_username("alice").unwrap().is_some());
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%"), "%50\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
        assert_eq!(like_pattern("c:\\"), "%c:\\\\%");
    }

    #[test]
    fn test_post_cannot_be_reply_and_retweet() {
        let storage = Storage::open_memory().unwrap();
        let alice = create_test_user(&storage, "alice");
        let bob = create_test_user(&storage, "bob");
        let original = create_test_post(&storage, &alice, "hi");

        let id = ids::next_id();
        let bad = Post {
            id: id.to_string(),
            author_id: bob.id.clone(),
            author_username: bob.username.clone(),
            text: "hi".into(),
            created_at: ids::timestamp_of(id),
            is_retweet: true,
            original_post_id: Some(original.id.clone()),
            parent_post_id: Some(original.id.clone()),
        };
        assert!(storage.insert_post(&bad).is_err());
    }

    #[test]
    fn test_self_notification_rejected_by_schema() {
        let storage = Storage::open_memory().unwrap();
        let alice = create_test_user(&storage, "alice");
        let result = storage.connection().execute(
            "INSERT INTO notifications (id, user_id, actor_id, kind, created_at) VALUES ('n', ?1, ?1, 'follow', 0)",
            params![alice.id],
        );
        assert!(result.is_err());
    }
}
