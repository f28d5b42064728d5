//! Terminal rendering of engine results.
//!
//! Every `render_*` function returns the finished text so it can be tested
//! without a terminal; [`Printer`] decides between that text and JSON.

use crate::cli::OutputFormat;
use crate::engine::{DeletedPost, PublishOutcome};
use crate::error::{Result, TwtError};
use crate::model::{
    Conversation, Message, NotificationKind, NotificationView, Post, PostDetails, Profile,
    ThreadEntry, TrendingHashtag, User,
};
use crate::text::{TokenKind, token_spans};
use crate::{CONTENT_DIVIDER_WIDTH, format_bytes, format_number, format_relative_date};
use colored::Colorize;
use serde::Serialize;
use std::fmt::Write;

/// Width post and message bodies are wrapped to.
const WRAP_WIDTH: usize = 76;

/// Writes command results to stdout in the selected format.
#[derive(Debug, Clone, Copy)]
pub struct Printer {
    format: OutputFormat,
}

impl Printer {
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    #[must_use]
    pub const fn is_json(&self) -> bool {
        !matches!(self.format, OutputFormat::Text)
    }

    /// Print `value` as JSON, or as the text `render` produces.
    ///
    /// # Errors
    ///
    /// Returns an error if `value` cannot be encoded as JSON.
    pub fn emit<T, F>(&self, value: &T, render: F) -> Result<()>
    where
        T: Serialize + ?Sized,
        F: FnOnce(&T) -> String,
    {
        let out = match self.format {
            OutputFormat::Text => render(value),
            OutputFormat::Json => serde_json::to_string(value)
                .map_err(|e| TwtError::with_context("Failed to encode JSON", e))?,
            OutputFormat::JsonPretty => serde_json::to_string_pretty(value)
                .map_err(|e| TwtError::with_context("Failed to encode JSON", e))?,
        };
        println!("{}", out.trim_end_matches('\n'));
        Ok(())
    }

    /// Report a completed action that has no result of its own.
    ///
    /// # Errors
    ///
    /// Returns an error if the status cannot be encoded as JSON.
    pub fn success(&self, message: &str) -> Result<()> {
        #[derive(Serialize)]
        struct Status<'a> {
            status: &'static str,
            message: &'a str,
        }

        self.emit(&Status { status: "ok", message }, |s| {
            format!("{} {}", "✓".green(), s.message)
        })
    }
}

/// Colour hashtags and mentions in `text`.
#[must_use]
pub fn highlight(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for (range, kind) in token_spans(text) {
        out.push_str(&text[cursor..range.start]);
        let token = &text[range.clone()];
        let painted = match kind {
            TokenKind::Hashtag => token.blue(),
            TokenKind::Mention => token.cyan(),
        };
        let _ = write!(out, "{painted}");
        cursor = range.end;
    }
    out.push_str(&text[cursor..]);
    out
}

fn wrapped(text: &str, indent: &str) -> String {
    let options = textwrap::Options::new(WRAP_WIDTH)
        .initial_indent(indent)
        .subsequent_indent(indent);
    textwrap::wrap(text, options)
        .iter()
        .map(|line| highlight(line))
        .collect::<Vec<_>>()
        .join("\n")
}

fn header(post: &Post) -> String {
    let mut line = format!(
        "{} {}",
        format!("@{}", post.author_username).green().bold(),
        format!("· {}", format_relative_date(post.created_at)).dimmed()
    );
    if post.is_retweet {
        let _ = write!(line, " {}", "retweeted".magenta());
    } else if let Some(parent) = &post.parent_post_id {
        let _ = write!(line, " {}", format!("replying to {parent}").dimmed());
    }
    line
}

/// A post as a short block: author, body, id.
#[must_use]
pub fn render_post(post: &Post) -> String {
    render_post_indented(post, "")
}

fn render_post_indented(post: &Post, indent: &str) -> String {
    format!(
        "{indent}{}\n{}\n{indent}{}",
        header(post),
        wrapped(&post.text, &format!("{indent}  ")),
        format!("id: {}", post.id).dimmed()
    )
}

/// A list of posts separated by blank lines, or `empty` if there are none.
#[must_use]
pub fn render_posts(posts: &[Post], empty: &str) -> String {
    if posts.is_empty() {
        return empty.yellow().to_string();
    }
    posts
        .iter()
        .map(render_post)
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[must_use]
pub fn render_post_details(details: &PostDetails) -> String {
    let post = &details.post;
    let mut out = String::new();
    let _ = writeln!(out, "{}", "─".repeat(CONTENT_DIVIDER_WIDTH));
    let _ = writeln!(out, "{}", header(post));
    let _ = writeln!(out, "{}", wrapped(&post.text, "  "));
    let _ = writeln!(out, "{}", "─".repeat(CONTENT_DIVIDER_WIDTH));
    let _ = writeln!(
        out,
        "  {} likes  {} retweets  {} replies",
        format_number(details.like_count).cyan(),
        format_number(details.retweet_count).cyan(),
        format_number(details.reply_count).cyan()
    );
    if let Some(original) = &post.original_post_id {
        let _ = writeln!(out, "  Original: {}", original.dimmed());
    }
    for media in &details.media {
        let dims = match (media.width, media.height) {
            (Some(w), Some(h)) => format!(" {w}x{h}"),
            _ => String::new(),
        };
        let _ = writeln!(
            out,
            "  Image {}: {} ({}{dims}, {})",
            media.position + 1,
            media.file_name,
            media.file_type,
            format_bytes(media.file_size)
        );
    }
    let _ = write!(
        out,
        "  ID: {}  Posted: {}",
        post.id.dimmed(),
        post.created_at.format("%Y-%m-%d %H:%M").to_string().dimmed()
    );
    out
}

#[must_use]
pub fn render_publish(outcome: &PublishOutcome) -> String {
    let what = if outcome.post.is_reply() { "Replied" } else { "Posted" };
    let mut out = format!("{} {what} {}", "✓".green(), outcome.post.id.bold());
    if !outcome.hashtags.is_empty() {
        let tags: Vec<String> = outcome.hashtags.iter().map(|t| format!("#{t}")).collect();
        let _ = write!(out, "\n  Hashtags: {}", tags.join(" ").blue());
    }
    if !outcome.mentions.is_empty() {
        let names: Vec<String> = outcome.mentions.iter().map(|u| format!("@{u}")).collect();
        let _ = write!(out, "\n  Mentioned: {}", names.join(" ").cyan());
    }
    for media in &outcome.media {
        let _ = write!(out, "\n  Attached: {}", media.file_name);
    }
    push_warnings(&mut out, &outcome.warnings);
    out
}

#[must_use]
pub fn render_deleted(deleted: &DeletedPost) -> String {
    let mut out = format!("{} Deleted post {}", "✓".green(), deleted.post.id.bold());
    if !deleted.media.is_empty() {
        let _ = write!(out, " and {} attachment(s)", deleted.media.len());
    }
    push_warnings(&mut out, &deleted.warnings);
    out
}

fn push_warnings(out: &mut String, warnings: &[String]) {
    for warning in warnings {
        let _ = write!(out, "\n  {} {}", "warning:".yellow().bold(), warning);
    }
}

/// Ancestors above, the focused post marked, replies indented below.
#[must_use]
pub fn render_thread(entries: &[ThreadEntry]) -> String {
    let top = entries.iter().map(|e| e.level).min().unwrap_or(0);
    entries
        .iter()
        .map(|entry| {
            let depth = usize::try_from(entry.level - top).unwrap_or(0);
            let indent = "  ".repeat(depth);
            let block = render_post_indented(&entry.post, &indent);
            if entry.level == 0 {
                format!("{}\n{block}", format!("{indent}▶").yellow())
            } else {
                block
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[must_use]
pub fn render_profile(profile: &Profile) -> String {
    let mut out = format!(
        "{}\n  {} posts  {} followers  {} following\n  Joined {}\n",
        format!("@{}", profile.user.username).green().bold(),
        format_number(profile.post_count).cyan(),
        format_number(profile.counts.followers).cyan(),
        format_number(profile.counts.following).cyan(),
        profile.user.created_at.format("%B %Y")
    );
    let _ = write!(out, "{}\n\n", "─".repeat(CONTENT_DIVIDER_WIDTH));
    out.push_str(&render_posts(&profile.posts, "No posts yet."));
    out
}

/// One `@username` per line, or `empty`.
#[must_use]
pub fn render_users(users: &[User], empty: &str) -> String {
    if users.is_empty() {
        return empty.yellow().to_string();
    }
    users
        .iter()
        .map(|u| format!("  @{}", u.username.green()))
        .collect::<Vec<_>>()
        .join("\n")
}

#[must_use]
pub fn render_trending(tags: &[TrendingHashtag]) -> String {
    if tags.is_empty() {
        return "No hashtags in this period.".yellow().to_string();
    }
    tags.iter()
        .enumerate()
        .map(|(i, t)| {
            let uses = if t.count == 1 { "post" } else { "posts" };
            format!(
                "{:>3}. {} {}",
                i + 1,
                format!("#{}", t.tag).blue().bold(),
                format!("({} {uses})", format_number(t.count)).dimmed()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn notification_line(view: &NotificationView) -> String {
    let actor = format!("@{}", view.actor_username).green().bold();
    let action = match view.notification.kind {
        NotificationKind::Like => "liked your post",
        NotificationKind::Retweet => "retweeted your post",
        NotificationKind::Follow => "followed you",
        NotificationKind::Reply => "replied to your post",
        NotificationKind::Mention => "mentioned you",
        NotificationKind::Message => "sent you a message",
    };
    let marker = if view.notification.read {
        " ".normal()
    } else {
        "●".yellow()
    };

    let mut line = format!(
        "{marker} {actor} {action} {}",
        format!("· {}", format_relative_date(view.notification.created_at)).dimmed()
    );
    if let Some(text) = &view.target_text {
        let _ = write!(line, "\n    \"{}\"", truncate(text, 60));
    } else if view.notification.kind.targets_post() {
        let _ = write!(line, "\n    {}", "(post deleted)".dimmed());
    }
    if let Some(target) = &view.notification.target_id {
        let _ = write!(line, "\n    {}", format!("target: {target}").dimmed());
    }
    let _ = write!(line, "\n    {}", format!("id: {}", view.notification.id).dimmed());
    line
}

#[must_use]
pub fn render_notifications(views: &[NotificationView], unread_only: bool) -> String {
    if views.is_empty() {
        let empty = if unread_only {
            "No unread notifications."
        } else {
            "No notifications yet."
        };
        return empty.yellow().to_string();
    }
    views
        .iter()
        .map(notification_line)
        .collect::<Vec<_>>()
        .join("\n")
}

/// A message as seen by `viewer_id`.
#[must_use]
pub fn render_message(message: &Message, viewer_id: &str) -> String {
    let direction = if message.sender_id == viewer_id {
        format!("You → @{}", message.receiver_username)
    } else {
        format!("@{} → You", message.sender_username)
    };
    let unread = if !message.read && message.receiver_id == viewer_id {
        format!(" {}", "new".yellow().bold())
    } else {
        String::new()
    };
    format!(
        "{} {}{unread}\n{}\n  {}",
        direction.green().bold(),
        format!("· {}", format_relative_date(message.created_at)).dimmed(),
        wrapped(&message.text, "  "),
        format!("id: {}", message.id).dimmed()
    )
}

#[must_use]
pub fn render_messages(messages: &[Message], viewer_id: &str, empty: &str) -> String {
    if messages.is_empty() {
        return empty.yellow().to_string();
    }
    messages
        .iter()
        .map(|m| render_message(m, viewer_id))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[must_use]
pub fn render_conversations(conversations: &[Conversation], viewer_id: &str) -> String {
    if conversations.is_empty() {
        return "No conversations yet.".yellow().to_string();
    }
    conversations
        .iter()
        .map(|c| {
            let prefix = if c.last_message.sender_id == viewer_id {
                "You: "
            } else {
                ""
            };
            let unread = if c.unread_count > 0 {
                format!(" {}", format!("({} unread)", c.unread_count).yellow().bold())
            } else {
                String::new()
            };
            format!(
                "{}{unread} {}\n  {prefix}{}",
                format!("@{}", c.partner_username).green().bold(),
                format!("· {}", format_relative_date(c.last_message.created_at)).dimmed(),
                truncate(&c.last_message.text, 60)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Shorten `text` to at most `max_chars` characters, ending in `...`.
#[must_use]
pub fn truncate(text: &str, max_chars: usize) -> String {
    let text = text.replace('\n', " ");
    if text.chars().count() <= max_chars {
        return text;
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{kept}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids;
    use crate::model::{FollowCounts, Notification};

    fn plain() {
        colored::control::set_override(false);
    }

    fn post(author: &str, text: &str) -> Post {
        let id = ids::next_id();
        Post {
            id: id.to_string(),
            author_id: "u1".into(),
            author_username: author.into(),
            text: text.into(),
            created_at: ids::timestamp_of(id),
            is_retweet: false,
            original_post_id: None,
            parent_post_id: None,
        }
    }

    #[test]
    fn highlight_keeps_text_intact() {
        plain();
        let text = "héllo @bob #rust, done";
        assert_eq!(highlight(text), text);
    }

    #[test]
    fn post_block_has_author_body_and_id() {
        plain();
        let p = post("alice", "Hello #world");
        let out = render_post(&p);
        assert!(out.starts_with("@alice · just now"));
        assert!(out.contains("  Hello #world"));
        assert!(out.ends_with(&format!("id: {}", p.id)));
    }

    #[test]
    fn long_posts_wrap() {
        plain();
        let p = post("alice", &"word ".repeat(40));
        let body_lines = render_post(&p).lines().count() - 2;
        assert!(body_lines >= 3);
    }

    #[test]
    fn thread_indents_by_level() {
        plain();
        let entries = vec![
            ThreadEntry { level: -1, post: post("alice", "root") },
            ThreadEntry { level: 0, post: post("bob", "focus") },
            ThreadEntry { level: 1, post: post("carol", "reply") },
        ];
        let out = render_thread(&entries);
        assert!(out.starts_with("@alice"));
        assert!(out.contains("  ▶\n  @bob"));
        assert!(out.contains("    @carol"));
    }

    #[test]
    fn profile_and_empty_lists() {
        plain();
        let user = User {
            id: "u1".into(),
            username: "alice".into(),
            created_at: chrono::Utc::now(),
        };
        let profile = Profile {
            user,
            counts: FollowCounts { followers: 1200, following: 3 },
            post_count: 0,
            posts: vec![],
        };
        let out = render_profile(&profile);
        assert!(out.contains("1,200 followers"));
        assert!(out.ends_with("No posts yet."));
        assert_eq!(render_users(&[], "Nobody."), "Nobody.");
    }

    #[test]
    fn notifications_describe_action_and_missing_targets() {
        plain();
        let view = NotificationView {
            notification: Notification {
                id: "n1".into(),
                user_id: "u1".into(),
                actor_id: "u2".into(),
                kind: NotificationKind::Like,
                target_id: Some("p1".into()),
                created_at: chrono::Utc::now(),
                read: false,
            },
            actor_username: "bob".into(),
            target_text: None,
        };
        let out = render_notifications(&[view], false);
        assert!(out.contains("@bob liked your post"));
        assert!(out.contains("(post deleted)"));
        assert_eq!(render_notifications(&[], true), "No unread notifications.");
    }

    #[test]
    fn trending_pluralizes() {
        plain();
        let tags = vec![
            TrendingHashtag { tag: "rust".into(), count: 2 },
            TrendingHashtag { tag: "go".into(), count: 1 },
        ];
        let out = render_trending(&tags);
        assert!(out.contains("1. #rust (2 posts)"));
        assert!(out.contains("2. #go (1 post)"));
    }

    #[test]
    fn truncate_counts_characters() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("ééééééééééé", 6), "ééé...");
        assert_eq!(truncate("a\nb", 10), "a b");
    }
}
