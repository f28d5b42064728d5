use super::{Storage, is_constraint_violation, to_millis, user_from_row};
use crate::error::{Result, TwtError};
use crate::model::User;
use rusqlite::params;
use tracing::debug;

impl Storage {
    /// Insert a new user.
    ///
    /// # Errors
    ///
    /// Returns [`TwtError::Conflict`] if the username is taken (case-insensitively).
    pub fn insert_user(&self, user: &User) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO users (id, username, created_at) VALUES (?1, ?2, ?3)",
                params![user.id, user.username, to_millis(user.created_at)],
            )
            .map_err(|e| {
                if is_constraint_violation(&e) {
                    TwtError::conflict(format!("Username @{} is already taken", user.username))
                } else {
                    e.into()
                }
            })?;
        Ok(())
    }

    /// Look up a user by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_user(&self, id: &str) -> Result<Option<User>> {
        let result = self.conn.query_row(
            "SELECT id, username, created_at FROM users WHERE id = ?",
            params![id],
            user_from_row,
        );

        match result {
            Ok(user) => Ok(Some(user)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Look up a user by username, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        debug!(username, "Looking up user");
        let result = self.conn.query_row(
            "SELECT id, username, created_at FROM users WHERE username = ? COLLATE NOCASE",
            params![username],
            user_from_row,
        );

        match result {
            Ok(user) => Ok(Some(user)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// All usernames, alphabetically. Used for "did you mean" hints.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn list_usernames(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT username FROM users ORDER BY username")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
    }

    /// Number of posts (including retweets) authored by a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn post_count(&self, author_id: &str) -> Result<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM posts WHERE author_id = ?",
            params![author_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
