use super::{Storage, from_millis, limit_to_i64, to_millis};
use crate::error::Result;
use crate::model::{Notification, NotificationKind, NotificationView};
use rusqlite::params;
use rusqlite::types::Type;

impl Storage {
    /// Insert a notification row.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails, including when recipient and
    /// actor are the same user.
    pub fn insert_notification(&self, notification: &Notification) -> Result<()> {
        self.conn.execute(
            r"
            INSERT INTO notifications (id, user_id, actor_id, kind, target_id, created_at, read)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
            params![
                notification.id,
                notification.user_id,
                notification.actor_id,
                notification.kind.as_str(),
                notification.target_id,
                to_millis(notification.created_at),
                i32::from(notification.read),
            ],
        )?;
        Ok(())
    }

    /// Notifications for `user_id`, newest first, with the actor's username
    /// and the text of the post or message they point at.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn notifications_for(
        &self,
        user_id: &str,
        unread_only: bool,
        limit: usize,
    ) -> Result<Vec<NotificationView>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT n.id, n.user_id, n.actor_id, n.kind, n.target_id, n.created_at, n.read,
                   a.username,
                   CASE WHEN n.kind = 'message' THEN m.text ELSE p.text END
            FROM notifications n
            JOIN users a ON a.id = n.actor_id
            LEFT JOIN posts p
                ON n.kind IN ('like', 'retweet', 'reply', 'mention') AND p.id = n.target_id
            LEFT JOIN messages m
                ON n.kind = 'message' AND m.id = n.target_id
            WHERE n.user_id = ?1 AND (?2 = 0 OR n.read = 0)
            ORDER BY n.created_at DESC, n.id DESC
            LIMIT ?3
            ",
        )?;

        let views = stmt
            .query_map(
                params![user_id, i32::from(unread_only), limit_to_i64(limit)],
                |row| {
                    let kind: String = row.get(3)?;
                    let kind = kind.parse::<NotificationKind>().map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(3, Type::Text, e.into())
                    })?;
                    Ok(NotificationView {
                        notification: Notification {
                            id: row.get(0)?,
                            user_id: row.get(1)?,
                            actor_id: row.get(2)?,
                            kind,
                            target_id: row.get(4)?,
                            created_at: from_millis(row.get(5)?),
                            read: row.get::<_, i32>(6)? != 0,
                        },
                        actor_username: row.get(7)?,
                        target_text: row.get(8)?,
                    })
                },
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(views)
    }

    /// Mark every unread notification of `user_id` as read.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn mark_notifications_read(&self, user_id: &str) -> Result<usize> {
        let affected = self.conn.execute(
            "UPDATE notifications SET read = 1 WHERE user_id = ? AND read = 0",
            params![user_id],
        )?;
        Ok(affected)
    }

    /// Delete every read notification of `user_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn delete_read_notifications(&self, user_id: &str) -> Result<usize> {
        let affected = self.conn.execute(
            "DELETE FROM notifications WHERE user_id = ? AND read = 1",
            params![user_id],
        )?;
        Ok(affected)
    }

    /// Delete one notification owned by `user_id`. Returns false if none matched.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn delete_notification(&self, id: &str, user_id: &str) -> Result<bool> {
        let affected = self.conn.execute(
            "DELETE FROM notifications WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        Ok(affected > 0)
    }

    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn unread_notification_count(&self, user_id: &str) -> Result<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND read = 0",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use crate::ids;
    use crate::model::{Notification, NotificationKind, User};
    use crate::storage::Storage;
    use crate::storage::tests::{create_test_post, create_test_user};

    fn notify(
        storage: &Storage,
        to: &User,
        from: &User,
        kind: NotificationKind,
        target: Option<&str>,
    ) -> Notification {
        let id = ids::next_id();
        let n = Notification {
            id: id.to_string(),
            user_id: to.id.clone(),
            actor_id: from.id.clone(),
            kind,
            target_id: target.map(str::to_string),
            created_at: ids::timestamp_of(id),
            read: false,
        };
        storage.insert_notification(&n).unwrap();
        n
    }

    #[test]
    fn test_notifications_newest_first_with_snippets() {
        let storage = Storage::open_memory().unwrap();
        let alice = create_test_user(&storage, "alice");
        let bob = create_test_user(&storage, "bob");
        let post = create_test_post(&storage, &alice, "my post");

        notify(&storage, &alice, &bob, NotificationKind::Follow, None);
        notify(&storage, &alice, &bob, NotificationKind::Like, Some(&post.id));

        let views = storage.notifications_for(&alice.id, false, 10).unwrap();
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].notification.kind, NotificationKind::Like);
        assert_eq!(views[0].target_text.as_deref(), Some("my post"));
        assert_eq!(views[0].actor_username, "bob");
        assert_eq!(views[1].notification.kind, NotificationKind::Follow);
        assert!(views[1].target_text.is_none());
    }

    #[test]
    fn test_deleted_target_yields_no_snippet() {
        let storage = Storage::open_memory().unwrap();
        let alice = create_test_user(&storage, "alice");
        let bob = create_test_user(&storage, "bob");
        let post = create_test_post(&storage, &alice, "soon gone");
        notify(&storage, &alice, &bob, NotificationKind::Like, Some(&post.id));

        storage.delete_post(&post.id, &alice.id).unwrap();
        let views = storage.notifications_for(&alice.id, false, 10).unwrap();
        assert_eq!(views.len(), 1);
        assert!(views[0].target_text.is_none());
    }

    #[test]
    fn test_read_state_and_bulk_operations() {
        let storage = Storage::open_memory().unwrap();
        let alice = create_test_user(&storage, "alice");
        let bob = create_test_user(&storage, "bob");
        notify(&storage, &alice, &bob, NotificationKind::Follow, None);
        notify(&storage, &bob, &alice, NotificationKind::Follow, None);

        assert_eq!(storage.unread_notification_count(&alice.id).unwrap(), 1);
        assert_eq!(storage.mark_notifications_read(&alice.id).unwrap(), 1);
        assert_eq!(storage.unread_notification_count(&alice.id).unwrap(), 0);
        assert!(storage.notifications_for(&alice.id, true, 10).unwrap().is_empty());
        assert_eq!(storage.notifications_for(&alice.id, false, 10).unwrap().len(), 1);

        notify(&storage, &alice, &bob, NotificationKind::Follow, None);
        assert_eq!(storage.delete_read_notifications(&alice.id).unwrap(), 1);
        assert_eq!(storage.notifications_for(&alice.id, false, 10).unwrap().len(), 1);

        // Bob's notification is untouched by Alice's bulk operations.
        assert_eq!(storage.unread_notification_count(&bob.id).unwrap(), 1);
    }

    #[test]
    fn test_delete_notification_scoped_to_recipient() {
        let storage = Storage::open_memory().unwrap();
        let alice = create_test_user(&storage, "alice");
        let bob = create_test_user(&storage, "bob");
        let n = notify(&storage, &alice, &bob, NotificationKind::Follow, None);

        assert!(!storage.delete_notification(&n.id, &bob.id).unwrap());
        assert!(storage.delete_notification(&n.id, &alice.id).unwrap());
    }
}
