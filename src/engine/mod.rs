//! The content graph engine.
//!
//! [`Engine`] applies the cross-entity rules on top of [`Storage`]: who may
//! follow, like, retweet or message whom, which notifications an action fans
//! out to, and how feeds and threads are assembled. Every operation that acts
//! for someone takes an explicit [`Session`].

mod messaging;
mod notifications;
mod publish;
mod social;
mod timeline;

pub use publish::{DeletedPost, PublishOutcome, PublishRequest};
pub use timeline::{DEFAULT_TRENDING_DAYS, MAX_THREAD_DEPTH};

use crate::error::{Result, TwtError};
use crate::ids;
use crate::media::AttachmentStore;
use crate::model::{Notification, NotificationKind, Post, User};
use crate::session::{self, Session};
use crate::storage::Storage;
use tracing::{debug, warn};

/// Engine bound to one storage connection and one attachment store.
pub struct Engine<'a> {
    storage: &'a mut Storage,
    attachments: &'a dyn AttachmentStore,
}

impl<'a> Engine<'a> {
    pub fn new(storage: &'a mut Storage, attachments: &'a dyn AttachmentStore) -> Self {
        Self {
            storage,
            attachments,
        }
    }

    /// Read-only access to the underlying storage.
    #[must_use]
    pub fn storage(&self) -> &Storage {
        &*self.storage
    }

    /// Resolve the configured username into a session.
    ///
    /// # Errors
    ///
    /// See [`Session::resolve`].
    pub fn session(&self, current_user: Option<&str>) -> Result<Session> {
        Session::resolve(&*self.storage, current_user)
    }

    /// Look up a user by name.
    ///
    /// # Errors
    ///
    /// Returns [`TwtError::UserNotFound`] with a suggestion when possible.
    pub fn user(&self, username: &str) -> Result<User> {
        session::lookup_user(&*self.storage, username)
    }

    fn post(&self, post_id: &str) -> Result<Post> {
        self.storage
            .get_post(post_id)?
            .ok_or_else(|| TwtError::not_found("Post", post_id))
    }

    /// Insert a notification unless recipient and actor are the same user.
    /// Returns whether a row was written.
    fn notify(
        &self,
        session: &Session,
        recipient_id: &str,
        kind: NotificationKind,
        target_id: Option<&str>,
    ) -> Result<bool> {
        if recipient_id == session.user_id() {
            return Ok(false);
        }

        let id = ids::next_id();
        self.storage.insert_notification(&Notification {
            id: id.to_string(),
            user_id: recipient_id.to_string(),
            actor_id: session.user_id().to_string(),
            kind,
            target_id: target_id.map(str::to_string),
            created_at: ids::timestamp_of(id),
            read: false,
        })?;
        debug!(recipient_id, %kind, "Queued notification");
        Ok(true)
    }

    /// Like [`Self::notify`], but a failure is logged and returned as a
    /// warning instead of failing the committed action.
    fn notify_best_effort(
        &self,
        session: &Session,
        recipient_id: &str,
        kind: NotificationKind,
        target_id: Option<&str>,
    ) -> Option<String> {
        self.notify(session, recipient_id, kind, target_id)
            .err()
            .map(|e| {
                warn!(recipient_id, %kind, error = %e, "Failed to create notification");
                format!("could not notify about {kind}: {e}")
            })
    }

    /// Notify for an action whose result carries no warnings. A failure is
    /// only logged.
    fn notify_or_log(
        &self,
        session: &Session,
        recipient_id: &str,
        kind: NotificationKind,
        target_id: Option<&str>,
    ) {
        if let Err(e) = self.notify(session, recipient_id, kind, target_id) {
            warn!(recipient_id, %kind, error = %e, "Failed to create notification");
        }
    }
}
