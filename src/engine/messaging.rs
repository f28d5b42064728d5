//! Direct messages.

use super::Engine;
use crate::error::{Result, TwtError};
use crate::ids;
use crate::model::{Conversation, Message, NotificationKind};
use crate::session::Session;
use crate::validation::validate_message_text;
use tracing::info;

impl Engine<'_> {
    /// Send a direct message and notify the receiver.
    ///
    /// A block in either direction closes the channel; the check runs before
    /// anything is written.
    ///
    /// # Errors
    ///
    /// Returns [`TwtError::Validation`] for empty or overlong text,
    /// [`TwtError::SelfReference`] when messaging yourself and
    /// [`TwtError::Forbidden`] when a block exists.
    pub fn send_message(&self, session: &Session, username: &str, text: &str) -> Result<Message> {
        let text = validate_message_text(text)?;
        let receiver = self.user(username)?;
        if receiver.id == session.user_id() {
            return Err(TwtError::self_reference("message"));
        }

        if self.storage.is_blocked(&receiver.id, session.user_id())? {
            return Err(TwtError::forbidden(format!(
                "@{} has blocked you",
                receiver.username
            )));
        }
        if self.storage.is_blocked(session.user_id(), &receiver.id)? {
            return Err(TwtError::forbidden(format!(
                "you have blocked @{}; unblock them to send messages",
                receiver.username
            )));
        }

        let id = ids::next_id();
        let message = Message {
            id: id.to_string(),
            sender_id: session.user_id().to_string(),
            sender_username: session.username().to_string(),
            receiver_id: receiver.id.clone(),
            receiver_username: receiver.username,
            text,
            created_at: ids::timestamp_of(id),
            read: false,
        };
        self.storage.insert_message(&message)?;
        info!(message_id = %message.id, to = %message.receiver_username, "Sent message");

        self.notify_or_log(
            session,
            &message.receiver_id,
            NotificationKind::Message,
            Some(&message.id),
        );
        Ok(message)
    }

    /// The latest `limit` messages with `username`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`TwtError::UserNotFound`] for an unknown name.
    pub fn conversation(
        &self,
        session: &Session,
        username: &str,
        limit: usize,
    ) -> Result<Vec<Message>> {
        let partner = self.user(username)?;
        self.storage
            .conversation(session.user_id(), &partner.id, limit)
    }

    /// One summary per counterpart, most recent first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn conversations(&self, session: &Session) -> Result<Vec<Conversation>> {
        self.storage.conversations(session.user_id())
    }

    /// Mark everything `username` sent to the session user as read.
    ///
    /// # Errors
    ///
    /// Returns [`TwtError::UserNotFound`] for an unknown name.
    pub fn mark_conversation_read(&self, session: &Session, username: &str) -> Result<usize> {
        let sender = self.user(username)?;
        let marked = self
            .storage
            .mark_conversation_read(session.user_id(), &sender.id)?;
        if marked > 0 {
            info!(reader = session.username(), from = %sender.username, marked, "Marked messages read");
        }
        Ok(marked)
    }

    /// Delete a message the session user sent.
    ///
    /// # Errors
    ///
    /// Returns [`TwtError::NotOwned`] if it does not exist or was sent by
    /// someone else.
    pub fn delete_message(&self, session: &Session, message_id: &str) -> Result<()> {
        if !self.storage.delete_message(message_id, session.user_id())? {
            return Err(TwtError::not_owned("Message", message_id));
        }
        info!(message_id, "Deleted message");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn inbox(&self, session: &Session, limit: usize) -> Result<Vec<Message>> {
        self.storage.inbox(session.user_id(), limit)
    }

    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn unread_message_count(&self, session: &Session) -> Result<i64> {
        self.storage.unread_message_count(session.user_id())
    }

    /// Messages the session user sent or received containing `query`.
    ///
    /// # Errors
    ///
    /// Returns [`TwtError::Validation`] for a blank query.
    pub fn search_messages(
        &self,
        session: &Session,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Message>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(TwtError::validation("search query cannot be empty"));
        }
        self.storage
            .search_messages(session.user_id(), query, limit)
    }
}
