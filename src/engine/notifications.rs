//! Notification inbox for the session user.

use super::Engine;
use crate::error::{Result, TwtError};
use crate::model::NotificationView;
use crate::session::Session;
use tracing::info;

impl Engine<'_> {
    /// Most recent notifications first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn notifications(
        &self,
        session: &Session,
        unread_only: bool,
        limit: usize,
    ) -> Result<Vec<NotificationView>> {
        self.storage
            .notifications_for(session.user_id(), unread_only, limit)
    }

    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn mark_all_read(&self, session: &Session) -> Result<usize> {
        let marked = self.storage.mark_notifications_read(session.user_id())?;
        info!(user = session.username(), marked, "Marked notifications read");
        Ok(marked)
    }

    /// Remove every notification already read.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn delete_all_read(&self, session: &Session) -> Result<usize> {
        let deleted = self.storage.delete_read_notifications(session.user_id())?;
        info!(user = session.username(), deleted, "Cleared read notifications");
        Ok(deleted)
    }

    /// # Errors
    ///
    /// Returns [`TwtError::NotFound`] unless the notification exists and
    /// belongs to the session user.
    pub fn delete_notification(&self, session: &Session, notification_id: &str) -> Result<()> {
        if !self
            .storage
            .delete_notification(notification_id, session.user_id())?
        {
            return Err(TwtError::not_found("Notification", notification_id));
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn unread_notification_count(&self, session: &Session) -> Result<i64> {
        self.storage.unread_notification_count(session.user_id())
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::PublishRequest;
    use crate::engine::tests::{Fixture, signup};
    use crate::error::TwtError;
    use crate::model::NotificationKind;

    #[test]
    fn test_fan_out_and_inbox_management() {
        let mut fx = Fixture::new();
        let mut engine = fx.engine();
        let alice = signup(&engine, "alice");
        let bob = signup(&engine, "bob");

        let post = engine
            .publish_post(&alice, PublishRequest::new("hello"))
            .unwrap()
            .post;
        engine.follow(&bob, "alice").unwrap();
        engine.like(&bob, &post.id).unwrap();

        let all = engine.notifications(&alice, false, 20).unwrap();
        let kinds: Vec<_> = all.iter().map(|n| n.notification.kind).collect();
        assert_eq!(kinds, vec![NotificationKind::Like, NotificationKind::Follow]);
        assert_eq!(all[0].actor_username, "bob");
        assert_eq!(all[0].target_text.as_deref(), Some("hello"));
        assert_eq!(engine.unread_notification_count(&alice).unwrap(), 2);

        assert_eq!(engine.mark_all_read(&alice).unwrap(), 2);
        assert!(engine.notifications(&alice, true, 20).unwrap().is_empty());

        assert!(matches!(
            engine.delete_notification(&bob, &all[0].notification.id),
            Err(TwtError::NotFound { .. })
        ));
        engine
            .delete_notification(&alice, &all[0].notification.id)
            .unwrap();
        assert_eq!(engine.delete_all_read(&alice).unwrap(), 1);
        assert!(engine.notifications(&alice, false, 20).unwrap().is_empty());
    }
}
