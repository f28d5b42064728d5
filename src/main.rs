//! twt - a local social network in your terminal
//!
//! Main entry point for the twt command-line tool.

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use colored::Colorize;
use serde::Serialize;
use std::io;
use std::path::Path;
use std::process::ExitCode;
use tracing::debug;

use twt::config::Config;
use twt::display::{self, Printer};
use twt::logging::init_cli_logging;
use twt::text::normalize_tag;
use twt::{
    Cli, Commands, Engine, FeedArgs, HashtagArgs, MediaDir, MentionsArgs, MessageCommand,
    NotificationsArgs, NotificationsCommand, OptionalUsernameArgs, OutputFormat, PostIdArgs,
    ProfileArgs, PublishRequest, SearchArgs, Session, Storage, TrendingArgs, TwtError, User,
    UserCommand, UsernameArgs, format_error, format_number, format_twt_error,
};

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Commands::Completions(args) = &cli.command {
        cmd_completions(args.shell);
        return ExitCode::SUCCESS;
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", render_error(&err));
            ExitCode::FAILURE
        }
    }
}

fn render_error(err: &anyhow::Error) -> String {
    err.downcast_ref::<TwtError>().map_or_else(
        || format_error("Error", &format!("{err:#}"), &[]),
        format_twt_error,
    )
}

/// Settings every command handler needs besides the engine.
struct App {
    config: Config,
    printer: Printer,
}

impl App {
    fn session(&self, engine: &Engine<'_>) -> Result<Session> {
        Ok(engine.session(self.config.session.current_user.as_deref())?)
    }

    /// `username`, or the logged-in user's name when none was given.
    fn username_or_self(&self, engine: &Engine<'_>, username: Option<String>) -> Result<String> {
        match username {
            Some(name) => Ok(name),
            None => Ok(self.session(engine)?.username().to_string()),
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    init_cli_logging(cli.quiet, cli.verbose, config.output.colors);
    if !config.output.colors {
        colored::control::set_override(false);
    }

    let format = cli
        .format
        .unwrap_or_else(|| OutputFormat::from_config(&config.output.format));

    let db_path = cli.db.clone().unwrap_or_else(|| config.db_path());
    ensure_parent(&db_path)?;
    let media_root = cli.media_dir.clone().unwrap_or_else(|| config.media_dir());
    debug!(db = %db_path.display(), media = %media_root.display(), "Resolved paths");

    let mut storage = Storage::open(&db_path)?;
    let media = MediaDir::new(media_root);
    let mut engine = Engine::new(&mut storage, &media);
    let app = App {
        config,
        printer: Printer::new(format),
    };

    match cli.command {
        Commands::User(args) => match args.command {
            UserCommand::Create(args) => cmd_user_create(&engine, &app, &args),
        },
        Commands::Login(args) => cmd_login(&engine, &app, &args),
        Commands::Logout => cmd_logout(&app),
        Commands::Whoami => cmd_whoami(&engine, &app),
        Commands::Post(args) => {
            let request = PublishRequest::new(args.text).with_images(args.images);
            cmd_publish(&mut engine, &app, request)
        }
        Commands::Reply(args) => {
            let request = PublishRequest::reply(args.post_id, args.text).with_images(args.images);
            cmd_publish(&mut engine, &app, request)
        }
        Commands::Delete(args) => cmd_delete(&engine, &app, &args),
        Commands::Show(args) => cmd_show(&engine, &app, &args),
        Commands::Profile(args) => cmd_profile(&engine, &app, args),
        Commands::Retweet(args) => cmd_retweet(&engine, &app, &args),
        Commands::Search(args) => cmd_search(&engine, &app, &args),
        Commands::Thread(args) => cmd_thread(&engine, &app, &args),
        Commands::Feed(args) => cmd_feed(&engine, &app, &args),
        Commands::Follow(args) => cmd_follow(&engine, &app, &args),
        Commands::Unfollow(args) => cmd_unfollow(&engine, &app, &args),
        Commands::Following(args) => cmd_following(&engine, &app, args),
        Commands::Followers(args) => cmd_followers(&engine, &app, args),
        Commands::Like(args) => cmd_like(&engine, &app, &args),
        Commands::Unlike(args) => cmd_unlike(&engine, &app, &args),
        Commands::Likes(args) => cmd_likes(&engine, &app, &args),
        Commands::Block(args) => cmd_block(&engine, &app, &args),
        Commands::Unblock(args) => cmd_unblock(&engine, &app, &args),
        Commands::Blocked => cmd_blocked(&engine, &app),
        Commands::Hashtag(args) => cmd_hashtag(&engine, &app, &args),
        Commands::Trending(args) => cmd_trending(&engine, &app, &args),
        Commands::Mentions(args) => cmd_mentions(&engine, &app, &args),
        Commands::Message(args) => cmd_message(&engine, &app, args.command),
        Commands::Notifications(args) => cmd_notifications(&engine, &app, args),
        Commands::Completions(args) => {
            cmd_completions(args.shell);
            Ok(())
        }
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    Ok(())
}

// =============================================================================
// Accounts
// =============================================================================

fn cmd_user_create(engine: &Engine<'_>, app: &App, args: &UsernameArgs) -> Result<()> {
    let user = engine.create_user(&args.username)?;
    app.printer.emit(&user, |u| {
        format!(
            "{} Created @{}\n  Log in with: twt login {}",
            "✓".green(),
            u.username.bold(),
            u.username
        )
    })?;
    Ok(())
}

fn cmd_login(engine: &Engine<'_>, app: &App, args: &UsernameArgs) -> Result<()> {
    let user = engine.user(&args.username)?;
    let path = Config::save_session(Some(&user.username))?;
    debug!(path = %path.display(), "Saved session");
    app.printer.emit(&user, |u| {
        format!("{} Logged in as @{}", "✓".green(), u.username.bold())
    })?;
    Ok(())
}

fn cmd_logout(app: &App) -> Result<()> {
    Config::save_session(None)?;
    app.printer.success("Logged out")?;
    Ok(())
}

#[derive(Serialize)]
struct Whoami<'a> {
    user: &'a User,
    unread_messages: i64,
    unread_notifications: i64,
}

fn cmd_whoami(engine: &Engine<'_>, app: &App) -> Result<()> {
    let session = app.session(engine)?;
    let view = Whoami {
        user: session.user(),
        unread_messages: engine.unread_message_count(&session)?,
        unread_notifications: engine.unread_notification_count(&session)?,
    };
    app.printer.emit(&view, |w| {
        format!(
            "@{}\n  {} unread messages  {} unread notifications",
            w.user.username.green().bold(),
            format_number(w.unread_messages).cyan(),
            format_number(w.unread_notifications).cyan()
        )
    })?;
    Ok(())
}

// =============================================================================
// Posts
// =============================================================================

fn cmd_publish(engine: &mut Engine<'_>, app: &App, request: PublishRequest) -> Result<()> {
    let session = app.session(engine)?;
    let outcome = engine.publish_post(&session, request)?;
    app.printer.emit(&outcome, display::render_publish)?;
    Ok(())
}

fn cmd_delete(engine: &Engine<'_>, app: &App, args: &PostIdArgs) -> Result<()> {
    let session = app.session(engine)?;
    let deleted = engine.delete_post(&session, &args.post_id)?;
    app.printer.emit(&deleted, display::render_deleted)?;
    Ok(())
}

fn cmd_show(engine: &Engine<'_>, app: &App, args: &PostIdArgs) -> Result<()> {
    let details = engine.post_details(&args.post_id)?;
    app.printer.emit(&details, display::render_post_details)?;
    Ok(())
}

fn cmd_profile(engine: &Engine<'_>, app: &App, args: ProfileArgs) -> Result<()> {
    let username = app.username_or_self(engine, args.username)?;
    let profile = engine.profile(&username, args.limit)?;
    app.printer.emit(&profile, display::render_profile)?;
    Ok(())
}

fn cmd_retweet(engine: &Engine<'_>, app: &App, args: &PostIdArgs) -> Result<()> {
    let session = app.session(engine)?;
    let retweet = engine.retweet(&session, &args.post_id)?;
    app.printer.emit(&retweet, |p| {
        format!("{} Retweeted\n\n{}", "✓".green(), display::render_post(p))
    })?;
    Ok(())
}

fn cmd_search(engine: &Engine<'_>, app: &App, args: &SearchArgs) -> Result<()> {
    let posts = engine.search(&args.query, args.limit)?;
    app.printer.emit(&posts, |p| {
        display::render_posts(p, &format!("No posts match '{}'.", args.query.trim()))
    })?;
    Ok(())
}

fn cmd_thread(engine: &Engine<'_>, app: &App, args: &PostIdArgs) -> Result<()> {
    let entries = engine.thread(&args.post_id)?;
    app.printer.emit(&entries, |e| display::render_thread(e))?;
    Ok(())
}

fn cmd_feed(engine: &Engine<'_>, app: &App, args: &FeedArgs) -> Result<()> {
    let session = app.session(engine)?;
    let limit = args.limit.unwrap_or(app.config.feed.default_limit);
    let posts = engine.feed(&session, limit, args.offset)?;
    app.printer.emit(&posts, |p| {
        display::render_posts(
            p,
            "Your feed is empty. Follow someone with 'twt follow <username>'.",
        )
    })?;
    Ok(())
}

// =============================================================================
// Social graph
// =============================================================================

fn cmd_follow(engine: &Engine<'_>, app: &App, args: &UsernameArgs) -> Result<()> {
    let session = app.session(engine)?;
    let user = engine.follow(&session, &args.username)?;
    app.printer.emit(&user, |u| {
        format!("{} Following @{}", "✓".green(), u.username.bold())
    })?;
    Ok(())
}

fn cmd_unfollow(engine: &Engine<'_>, app: &App, args: &UsernameArgs) -> Result<()> {
    let session = app.session(engine)?;
    let user = engine.unfollow(&session, &args.username)?;
    app.printer.emit(&user, |u| {
        format!("{} Unfollowed @{}", "✓".green(), u.username.bold())
    })?;
    Ok(())
}

fn cmd_following(engine: &Engine<'_>, app: &App, args: OptionalUsernameArgs) -> Result<()> {
    let username = app.username_or_self(engine, args.username)?;
    let users = engine.following(&username)?;
    app.printer.emit(&users, |u| {
        display::render_users(u, &format!("@{username} is not following anyone."))
    })?;
    Ok(())
}

fn cmd_followers(engine: &Engine<'_>, app: &App, args: OptionalUsernameArgs) -> Result<()> {
    let username = app.username_or_self(engine, args.username)?;
    let users = engine.followers(&username)?;
    app.printer.emit(&users, |u| {
        display::render_users(u, &format!("@{username} has no followers yet."))
    })?;
    Ok(())
}

fn cmd_like(engine: &Engine<'_>, app: &App, args: &PostIdArgs) -> Result<()> {
    let session = app.session(engine)?;
    let post = engine.like(&session, &args.post_id)?;
    app.printer.emit(&post, |p| {
        format!("{} Liked post by @{}", "✓".green(), p.author_username.bold())
    })?;
    Ok(())
}

fn cmd_unlike(engine: &Engine<'_>, app: &App, args: &PostIdArgs) -> Result<()> {
    let session = app.session(engine)?;
    engine.unlike(&session, &args.post_id)?;
    app.printer.success(&format!("Unliked post {}", args.post_id))?;
    Ok(())
}

fn cmd_likes(engine: &Engine<'_>, app: &App, args: &PostIdArgs) -> Result<()> {
    let users = engine.likers(&args.post_id)?;
    app.printer
        .emit(&users, |u| display::render_users(u, "No likes yet."))?;
    Ok(())
}

fn cmd_block(engine: &Engine<'_>, app: &App, args: &UsernameArgs) -> Result<()> {
    let session = app.session(engine)?;
    let user = engine.block(&session, &args.username)?;
    app.printer.emit(&user, |u| {
        format!("{} Blocked @{}", "✓".green(), u.username.bold())
    })?;
    Ok(())
}

fn cmd_unblock(engine: &Engine<'_>, app: &App, args: &UsernameArgs) -> Result<()> {
    let session = app.session(engine)?;
    let user = engine.unblock(&session, &args.username)?;
    app.printer.emit(&user, |u| {
        format!("{} Unblocked @{}", "✓".green(), u.username.bold())
    })?;
    Ok(())
}

fn cmd_blocked(engine: &Engine<'_>, app: &App) -> Result<()> {
    let session = app.session(engine)?;
    let users = engine.blocked_users(&session)?;
    app.printer
        .emit(&users, |u| display::render_users(u, "You have not blocked anyone."))?;
    Ok(())
}

// =============================================================================
// Discovery
// =============================================================================

fn cmd_hashtag(engine: &Engine<'_>, app: &App, args: &HashtagArgs) -> Result<()> {
    let posts = engine.posts_by_hashtag(&args.tag, args.limit)?;
    app.printer.emit(&posts, |p| {
        display::render_posts(p, &format!("No posts tagged #{}.", normalize_tag(&args.tag)))
    })?;
    Ok(())
}

fn cmd_trending(engine: &Engine<'_>, app: &App, args: &TrendingArgs) -> Result<()> {
    let since = Utc::now() - Duration::days(args.days);
    let tags = engine.trending_hashtags(args.limit, since)?;
    app.printer.emit(&tags, |t| display::render_trending(t))?;
    Ok(())
}

fn cmd_mentions(engine: &Engine<'_>, app: &App, args: &MentionsArgs) -> Result<()> {
    let session = app.session(engine)?;
    let posts = engine.mentions(&session, args.limit)?;
    app.printer
        .emit(&posts, |p| display::render_posts(p, "Nobody has mentioned you yet."))?;
    Ok(())
}

// =============================================================================
// Direct messages
// =============================================================================

fn cmd_message(engine: &Engine<'_>, app: &App, command: MessageCommand) -> Result<()> {
    let session = app.session(engine)?;
    let me = session.user_id();

    match command {
        MessageCommand::Send(args) => {
            let message = engine.send_message(&session, &args.username, &args.text)?;
            app.printer.emit(&message, |m| {
                format!(
                    "{} Message sent to @{}",
                    "✓".green(),
                    m.receiver_username.bold()
                )
            })?;
        }
        MessageCommand::Inbox(args) => {
            let messages = engine.inbox(&session, args.limit)?;
            app.printer.emit(&messages, |m| {
                display::render_messages(m, me, "Your inbox is empty.")
            })?;
        }
        MessageCommand::Conversation(args) => {
            let messages = engine.conversation(&session, &args.username, args.limit)?;
            engine.mark_conversation_read(&session, &args.username)?;
            app.printer.emit(&messages, |m| {
                display::render_messages(m, me, "No messages yet.")
            })?;
        }
        MessageCommand::List => {
            let conversations = engine.conversations(&session)?;
            app.printer
                .emit(&conversations, |c| display::render_conversations(c, me))?;
        }
        MessageCommand::Unread => {
            let count = engine.unread_message_count(&session)?;
            app.printer
                .emit(&count, |n| format!("{} unread messages", format_number(*n)))?;
        }
        MessageCommand::Delete(args) => {
            engine.delete_message(&session, &args.message_id)?;
            app.printer
                .success(&format!("Deleted message {}", args.message_id))?;
        }
        MessageCommand::Search(args) => {
            let messages = engine.search_messages(&session, &args.query, args.limit)?;
            let empty = format!("No messages match '{}'.", args.query.trim());
            app.printer
                .emit(&messages, |m| display::render_messages(m, me, &empty))?;
        }
    }
    Ok(())
}

// =============================================================================
// Notifications
// =============================================================================

fn cmd_notifications(engine: &Engine<'_>, app: &App, args: NotificationsArgs) -> Result<()> {
    let session = app.session(engine)?;

    match args.command {
        None => {
            let views = engine.notifications(&session, args.unread, args.limit)?;
            app.printer.emit(&views, |v| {
                display::render_notifications(v, args.unread)
            })?;
        }
        Some(NotificationsCommand::Read) => {
            let marked = engine.mark_all_read(&session)?;
            app.printer
                .success(&format!("Marked {marked} notifications as read"))?;
        }
        Some(NotificationsCommand::Count) => {
            let count = engine.unread_notification_count(&session)?;
            app.printer.emit(&count, |n| {
                format!("{} unread notifications", format_number(*n))
            })?;
        }
        Some(NotificationsCommand::Clear) => {
            let deleted = engine.delete_all_read(&session)?;
            app.printer
                .success(&format!("Deleted {deleted} read notifications"))?;
        }
        Some(NotificationsCommand::Delete(args)) => {
            engine.delete_notification(&session, &args.notification_id)?;
            app.printer
                .success(&format!("Deleted notification {}", args.notification_id))?;
        }
    }
    Ok(())
}

fn cmd_completions(shell: clap_complete::Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "twt", &mut io::stdout());
}
