use super::{
    MESSAGE_COLUMNS, MESSAGE_JOINS, Storage, like_pattern, limit_to_i64, message_from_row,
    to_millis,
};
use crate::error::Result;
use crate::model::{Conversation, Message};
use rusqlite::params;

impl Storage {
    /// Insert a message row.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub fn insert_message(&self, message: &Message) -> Result<()> {
        self.conn.execute(
            r"
            INSERT INTO messages (id, sender_id, receiver_id, text, created_at, read)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
            params![
                message.id,
                message.sender_id,
                message.receiver_id,
                message.text,
                to_millis(message.created_at),
                i32::from(message.read),
            ],
        )?;
        Ok(())
    }

    /// The most recent `limit` messages between two users, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn conversation(&self, user_a: &str, user_b: &str, limit: usize) -> Result<Vec<Message>> {
        let mut messages = self.query_messages(
            &format!(
                r"
                SELECT {MESSAGE_COLUMNS} FROM {MESSAGE_JOINS}
                WHERE (m.sender_id = ?1 AND m.receiver_id = ?2)
                   OR (m.sender_id = ?2 AND m.receiver_id = ?1)
                ORDER BY m.created_at DESC, m.id DESC
                LIMIT ?3
                "
            ),
            params![user_a, user_b, limit_to_i64(limit)],
        )?;
        messages.reverse();
        Ok(messages)
    }

    /// One entry per counterpart of `user_id` with the latest message and the
    /// number of unread messages from that counterpart, most recent first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn conversations(&self, user_id: &str) -> Result<Vec<Conversation>> {
        let mut stmt = self.conn.prepare(&format!(
            r"
            WITH latest AS (
                SELECT CASE WHEN sender_id = ?1 THEN receiver_id ELSE sender_id END AS partner_id,
                       MAX(id) AS last_id
                FROM messages
                WHERE sender_id = ?1 OR receiver_id = ?1
                GROUP BY partner_id
            )
            SELECT {MESSAGE_COLUMNS}, latest.partner_id, pu.username,
                   (SELECT COUNT(*) FROM messages x
                    WHERE x.sender_id = latest.partner_id AND x.receiver_id = ?1 AND x.read = 0)
            FROM latest
            JOIN messages m ON m.id = latest.last_id
            JOIN users s ON s.id = m.sender_id
            JOIN users r ON r.id = m.receiver_id
            JOIN users pu ON pu.id = latest.partner_id
            ORDER BY m.created_at DESC, m.id DESC
            "
        ))?;

        let conversations = stmt
            .query_map(params![user_id], |row| {
                Ok(Conversation {
                    last_message: message_from_row(row)?,
                    partner_id: row.get(8)?,
                    partner_username: row.get(9)?,
                    unread_count: row.get(10)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(conversations)
    }

    /// Mark messages from `sender_id` to `receiver_id` as read. The other
    /// direction is untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn mark_conversation_read(&self, receiver_id: &str, sender_id: &str) -> Result<usize> {
        let affected = self.conn.execute(
            "UPDATE messages SET read = 1 WHERE receiver_id = ?1 AND sender_id = ?2 AND read = 0",
            params![receiver_id, sender_id],
        )?;
        Ok(affected)
    }

    /// Delete a message sent by `sender_id`. Returns false if none matched.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn delete_message(&self, id: &str, sender_id: &str) -> Result<bool> {
        let affected = self.conn.execute(
            "DELETE FROM messages WHERE id = ?1 AND sender_id = ?2",
            params![id, sender_id],
        )?;
        Ok(affected > 0)
    }

    /// Messages received by `user_id`, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn inbox(&self, user_id: &str, limit: usize) -> Result<Vec<Message>> {
        self.query_messages(
            &format!(
                r"
                SELECT {MESSAGE_COLUMNS} FROM {MESSAGE_JOINS}
                WHERE m.receiver_id = ?1
                ORDER BY m.created_at DESC, m.id DESC
                LIMIT ?2
                "
            ),
            params![user_id, limit_to_i64(limit)],
        )
    }

    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn unread_message_count(&self, user_id: &str) -> Result<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM messages WHERE receiver_id = ? AND read = 0",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Messages sent or received by `user_id` containing `query`, newest
    /// first. Same matching rules as post search.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn search_messages(&self, user_id: &str, query: &str, limit: usize) -> Result<Vec<Message>> {
        self.query_messages(
            &format!(
                r"
                SELECT {MESSAGE_COLUMNS} FROM {MESSAGE_JOINS}
                WHERE (m.sender_id = ?1 OR m.receiver_id = ?1)
                  AND m.text LIKE ?2 ESCAPE '\'
                ORDER BY m.created_at DESC, m.id DESC
                LIMIT ?3
                "
            ),
            params![user_id, like_pattern(query), limit_to_i64(limit)],
        )
    }

    fn query_messages(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<Message>> {
        let mut stmt = self.conn.prepare(sql)?;
        let messages = stmt
            .query_map(params, message_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(messages)
    }
}
