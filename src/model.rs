//! Domain entities returned by the engine.
//!
//! Rows that reference users carry the resolved username next to the id so
//! the presentation layer never has to go back to storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A local account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

/// An original post, a reply, or a retweet.
///
/// `is_retweet` implies `original_post_id` is set and `parent_post_id` is not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub author_id: String,
    pub author_username: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub is_retweet: bool,
    pub original_post_id: Option<String>,
    pub parent_post_id: Option<String>,
}

impl Post {
    /// True if this post answers another post.
    #[must_use]
    pub const fn is_reply(&self) -> bool {
        self.parent_post_id.is_some()
    }
}

/// One row of a thread view. Ancestors have negative levels, the focused
/// post is level 0 and its direct replies are level 1.
#[derive(Debug, Clone, Serialize)]
pub struct ThreadEntry {
    pub level: i32,
    pub post: Post,
}

/// Follower and following totals for one user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FollowCounts {
    pub followers: i64,
    pub following: i64,
}

/// A user with counters and their most recent posts.
#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub user: User,
    pub counts: FollowCounts,
    pub post_count: i64,
    pub posts: Vec<Post>,
}

/// A hashtag with its number of recent uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrendingHashtag {
    pub tag: String,
    pub count: i64,
}

/// An image attached to a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    pub id: String,
    pub post_id: String,
    pub file_path: String,
    pub file_name: String,
    pub file_type: String,
    pub file_size: i64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub position: u8,
    pub created_at: DateTime<Utc>,
}

/// A post together with its engagement counters and attachments.
#[derive(Debug, Clone, Serialize)]
pub struct PostDetails {
    pub post: Post,
    pub like_count: i64,
    pub retweet_count: i64,
    pub reply_count: i64,
    pub media: Vec<Media>,
}

/// Kinds of notification produced as side effects of other operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Like,
    Retweet,
    Follow,
    Reply,
    Mention,
    Message,
}

impl NotificationKind {
    /// Name stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Retweet => "retweet",
            Self::Follow => "follow",
            Self::Reply => "reply",
            Self::Mention => "mention",
            Self::Message => "message",
        }
    }

    /// True if `target_id` points at a post.
    #[must_use]
    pub const fn targets_post(self) -> bool {
        matches!(self, Self::Like | Self::Retweet | Self::Reply | Self::Mention)
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" => Ok(Self::Like),
            "retweet" => Ok(Self::Retweet),
            "follow" => Ok(Self::Follow),
            "reply" => Ok(Self::Reply),
            "mention" => Ok(Self::Mention),
            "message" => Ok(Self::Message),
            _ => Err(format!("Unknown notification kind: {s}")),
        }
    }
}

/// A stored notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub actor_id: String,
    pub kind: NotificationKind,
    pub target_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

/// A notification annotated for display.
///
/// `target_text` is `None` when the kind has no target or the target was deleted.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationView {
    #[serde(flatten)]
    pub notification: Notification,
    pub actor_username: String,
    pub target_text: Option<String>,
}

/// A direct message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub id: String,
    pub sender_id: String,
    pub sender_username: String,
    pub receiver_id: String,
    pub receiver_username: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

/// Summary of the message exchange with one counterpart.
#[derive(Debug, Clone, Serialize)]
pub struct Conversation {
    pub partner_id: String,
    pub partner_username: String,
    pub last_message: Message,
    pub unread_count: i64,
}
