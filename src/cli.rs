//! CLI definitions for twt.
//!
//! Uses clap for argument parsing with derive macros.

use crate::engine::DEFAULT_TRENDING_DAYS;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// twt - a local social network in your terminal
#[derive(Parser, Debug)]
#[command(name = "twt")]
#[command(version)]
#[command(about = "A local social network in your terminal")]
#[command(long_about = r#"
twt keeps a small social network on your machine: post, reply, retweet,
follow, like, mention, tag and message between local users.

Quick start:
  1. twt user create alice
  2. twt login alice
  3. twt post "Hello #world"
  4. twt feed
"#)]
pub struct Cli {
    /// Path to the database file
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Directory attachments are copied into
    #[arg(long, global = true)]
    pub media_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Show more diagnostics on stderr (repeat for more)
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only report errors on stderr
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage accounts
    User(UserArgs),

    /// Log in as an existing user
    Login(UsernameArgs),

    /// Forget the logged-in user
    Logout,

    /// Show the logged-in user and what is unread
    Whoami,

    /// Publish a post
    Post(PostArgs),

    /// Reply to a post
    Reply(ReplyArgs),

    /// Delete one of your posts
    Delete(PostIdArgs),

    /// Show a post with its counters and attachments
    Show(PostIdArgs),

    /// Show a user's profile and recent posts
    Profile(ProfileArgs),

    /// Retweet a post
    Retweet(PostIdArgs),

    /// Search posts by text
    Search(SearchArgs),

    /// Show a post with its ancestors and replies
    Thread(PostIdArgs),

    /// Your timeline: your posts and those of people you follow
    Feed(FeedArgs),

    /// Follow a user
    Follow(UsernameArgs),

    /// Stop following a user
    Unfollow(UsernameArgs),

    /// List who a user follows (default: you)
    Following(OptionalUsernameArgs),

    /// List a user's followers (default: you)
    Followers(OptionalUsernameArgs),

    /// Like a post
    Like(PostIdArgs),

    /// Remove your like from a post
    Unlike(PostIdArgs),

    /// List who liked a post
    Likes(PostIdArgs),

    /// Block a user (closes direct messages both ways)
    Block(UsernameArgs),

    /// Unblock a user
    Unblock(UsernameArgs),

    /// List users you have blocked
    Blocked,

    /// Posts with a hashtag
    Hashtag(HashtagArgs),

    /// Most used hashtags recently
    Trending(TrendingArgs),

    /// Posts that mention you
    Mentions(MentionsArgs),

    /// Direct messages
    #[command(alias = "dm")]
    Message(MessageArgs),

    /// Your notifications
    #[command(alias = "notifs")]
    Notifications(NotificationsArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Debug)]
pub struct UserArgs {
    #[command(subcommand)]
    pub command: UserCommand,
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    /// Create a new user (3-15 letters, digits or underscores)
    Create(UsernameArgs),
}

#[derive(Args, Debug)]
pub struct UsernameArgs {
    /// Username, with or without a leading @
    pub username: String,
}

#[derive(Args, Debug)]
pub struct OptionalUsernameArgs {
    /// Username, with or without a leading @
    pub username: Option<String>,
}

#[derive(Args, Debug)]
pub struct PostIdArgs {
    /// Post ID
    pub post_id: String,
}

#[derive(Args, Debug)]
pub struct PostArgs {
    /// Post text (at most 280 characters)
    pub text: String,

    /// Attach an image (JPEG, PNG or GIF, up to 4)
    #[arg(long = "image", short = 'i', value_name = "PATH")]
    pub images: Vec<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ReplyArgs {
    /// Post to reply to
    pub post_id: String,

    /// Reply text (at most 280 characters)
    pub text: String,

    /// Attach an image (JPEG, PNG or GIF, up to 4)
    #[arg(long = "image", short = 'i', value_name = "PATH")]
    pub images: Vec<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ProfileArgs {
    /// Username (default: you)
    pub username: Option<String>,

    /// Number of posts to show
    #[arg(long, short = 'n', default_value = "20")]
    pub limit: usize,
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Text to look for
    pub query: String,

    /// Maximum number of results
    #[arg(long, short = 'n', default_value = "20")]
    pub limit: usize,
}

#[derive(Args, Debug)]
pub struct FeedArgs {
    /// Number of posts (default from config, else 20)
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,

    /// Skip the first N posts
    #[arg(long, default_value = "0")]
    pub offset: usize,
}

#[derive(Args, Debug)]
pub struct HashtagArgs {
    /// Tag, with or without the leading #
    pub tag: String,

    /// Maximum number of posts
    #[arg(long, short = 'n', default_value = "50")]
    pub limit: usize,
}

#[derive(Args, Debug)]
pub struct TrendingArgs {
    /// Look back this many days
    #[arg(
        long,
        short = 'd',
        default_value_t = DEFAULT_TRENDING_DAYS,
        value_parser = clap::value_parser!(i64).range(1..)
    )]
    pub days: i64,

    /// Number of hashtags
    #[arg(long, short = 'n', default_value = "10")]
    pub limit: usize,
}

#[derive(Args, Debug)]
pub struct MentionsArgs {
    /// Maximum number of posts
    #[arg(long, short = 'n', default_value = "50")]
    pub limit: usize,
}

#[derive(Args, Debug)]
pub struct MessageArgs {
    #[command(subcommand)]
    pub command: MessageCommand,
}

#[derive(Subcommand, Debug)]
pub enum MessageCommand {
    /// Send a direct message
    Send(SendMessageArgs),

    /// Messages you received, newest first
    Inbox(InboxArgs),

    /// Your exchange with one user (marks it read)
    Conversation(ConversationArgs),

    /// One line per conversation
    List,

    /// Number of unread messages
    Unread,

    /// Delete a message you sent
    Delete(MessageIdArgs),

    /// Search your messages
    Search(MessageSearchArgs),
}

#[derive(Args, Debug)]
pub struct InboxArgs {
    /// Maximum number of messages
    #[arg(long, short = 'n', default_value = "20")]
    pub limit: usize,
}

#[derive(Args, Debug)]
pub struct SendMessageArgs {
    /// Recipient
    pub username: String,

    /// Message text (at most 1000 characters)
    pub text: String,
}

#[derive(Args, Debug)]
pub struct ConversationArgs {
    /// The other user
    pub username: String,

    /// Number of most recent messages
    #[arg(long, short = 'n', default_value = "50")]
    pub limit: usize,
}

#[derive(Args, Debug)]
pub struct MessageIdArgs {
    /// Message ID
    pub message_id: String,
}

#[derive(Args, Debug)]
pub struct MessageSearchArgs {
    /// Text to look for
    pub query: String,

    /// Maximum number of results
    #[arg(long, short = 'n', default_value = "50")]
    pub limit: usize,
}

#[derive(Args, Debug)]
pub struct NotificationsArgs {
    /// Only unread notifications
    #[arg(long, short = 'u')]
    pub unread: bool,

    /// Maximum number of notifications
    #[arg(long, short = 'n', default_value = "20")]
    pub limit: usize,

    #[command(subcommand)]
    pub command: Option<NotificationsCommand>,
}

#[derive(Subcommand, Debug)]
pub enum NotificationsCommand {
    /// Mark all notifications as read
    Read,

    /// Number of unread notifications
    Count,

    /// Delete all read notifications
    Clear,

    /// Delete one notification
    Delete(NotificationIdArgs),
}

#[derive(Args, Debug)]
pub struct NotificationIdArgs {
    /// Notification ID
    pub notification_id: String,
}

#[derive(Args, Debug, Clone)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    JsonPretty,
}

impl OutputFormat {
    /// Parse the `output.format` config value, falling back to text.
    #[must_use]
    pub fn from_config(value: &str) -> Self {
        <Self as ValueEnum>::from_str(value, true).unwrap_or_default()
    }
}
