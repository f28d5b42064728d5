//! twt - a local social network in the terminal
//!
//! Posts, replies, retweets, follows, likes, hashtags, mentions, direct
//! messages and notifications for the users of one machine, kept in a
//! `SQLite` database.
//!
//! # Modules
//!
//! - [`engine`] - Cross-entity rules: publication, social edges, feeds, messaging
//! - [`storage`] - `SQLite` storage layer, one query file per entity
//! - [`text`] - Hashtag and mention extraction
//! - [`session`] - The acting user for one command
//! - [`media`] - Image validation and the attachment store
//! - [`display`] - Terminal rendering of engine results
//! - [`cli`] - Command-line interface definitions
//! - [`error`] - Custom error types with rich context

pub mod cli;
pub mod config;
pub mod display;
pub mod engine;
pub mod error;
pub mod ids;
pub mod logging;
pub mod media;
pub mod model;
pub mod session;
pub mod storage;
pub mod text;
pub mod validation;

pub use cli::*;
pub use engine::{DeletedPost, Engine, PublishOutcome, PublishRequest};
pub use error::{
    Result, TwtError, find_closest_match, format_did_you_mean, format_error, format_twt_error,
};
pub use media::{AttachmentStore, MediaDir};
pub use model::*;
pub use session::Session;
pub use storage::Storage;

use chrono::{DateTime, Datelike, Utc};

/// Default database filename
pub const DEFAULT_DB_NAME: &str = "twt.db";

/// Default attachment directory name
pub const DEFAULT_MEDIA_DIR: &str = "media";

/// Standard width for content dividers in CLI output
pub const CONTENT_DIVIDER_WIDTH: usize = 60;

const BYTES_PER_KB: u64 = 1024;
const BYTES_PER_MB: u64 = 1024 * 1024;

/// Get the default data directory for twt
#[must_use]
pub fn default_data_dir() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("twt")
}

/// Get the default database path
#[must_use]
pub fn default_db_path() -> std::path::PathBuf {
    default_data_dir().join(DEFAULT_DB_NAME)
}

/// Get the default attachment directory
#[must_use]
pub fn default_media_dir() -> std::path::PathBuf {
    default_data_dir().join(DEFAULT_MEDIA_DIR)
}

/// Format an integer with thousands separators.
#[must_use]
pub fn format_number(value: i64) -> String {
    let abs = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(abs.len() + abs.len() / 3);

    for (idx, ch) in abs.chars().rev().enumerate() {
        if idx > 0 && idx % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }

    let mut formatted: String = out.chars().rev().collect();
    if value < 0 {
        formatted.insert(0, '-');
    }
    formatted
}

/// Format a datetime as a human-friendly relative string.
///
/// - < 1 minute: "just now"
/// - < 1 hour: "Nm ago"
/// - < 24 hours: "Nh ago"
/// - < 7 days: "Nd ago"
/// - Same calendar year: "Mon D"
/// - Different year: "Mon D, YYYY"
#[must_use]
pub fn format_relative_date(dt: DateTime<Utc>) -> String {
    format_relative_date_with_base(dt, Utc::now())
}

/// Format a datetime relative to a fixed base time (useful for tests).
#[must_use]
pub fn format_relative_date_with_base(dt: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let duration = now.signed_duration_since(dt);

    // Clock skew between invocations can put a row slightly in the future.
    if duration.num_seconds() < 0 {
        return "just now".to_string();
    }

    let minutes = duration.num_minutes();
    let hours = duration.num_hours();
    let days = duration.num_days();

    if duration.num_seconds() < 60 {
        "just now".to_string()
    } else if minutes < 60 {
        format!("{minutes}m ago")
    } else if hours < 24 {
        format!("{hours}h ago")
    } else if days < 7 {
        format!("{days}d ago")
    } else if dt.year() == now.year() {
        dt.format("%b %d").to_string()
    } else {
        dt.format("%b %d, %Y").to_string()
    }
}

/// Format bytes into a human-friendly string.
#[must_use]
pub fn format_bytes(bytes: i64) -> String {
    let bytes = u64::try_from(bytes.max(0)).unwrap_or(0);
    if bytes < BYTES_PER_KB {
        format!("{bytes} B")
    } else if bytes < BYTES_PER_MB {
        format_bytes_with_unit(bytes, BYTES_PER_KB, "KB")
    } else {
        format_bytes_with_unit(bytes, BYTES_PER_MB, "MB")
    }
}

fn format_bytes_with_unit(bytes: u64, unit: u64, suffix: &str) -> String {
    let whole = bytes / unit;
    let tenths = (bytes % unit) * 10 / unit;
    format!("{whole}.{tenths} {suffix}")
}

#[cfg(test)]
mod tests {
    use super::{format_bytes, format_number, format_relative_date_with_base};
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn format_number_adds_separators() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(-12_345), "-12,345");
    }

    #[test]
    fn format_relative_date_thresholds() {
        let base = Utc
            .with_ymd_and_hms(2025, 1, 10, 12, 0, 0)
            .single()
            .unwrap();

        assert_eq!(
            format_relative_date_with_base(base - Duration::seconds(30), base),
            "just now"
        );
        assert_eq!(
            format_relative_date_with_base(base - Duration::minutes(5), base),
            "5m ago"
        );
        assert_eq!(
            format_relative_date_with_base(base - Duration::hours(3), base),
            "3h ago"
        );
        assert_eq!(
            format_relative_date_with_base(base - Duration::days(2), base),
            "2d ago"
        );

        let same_year = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).single().unwrap();
        assert_eq!(format_relative_date_with_base(same_year, base), "Jan 01");

        let different_year = Utc
            .with_ymd_and_hms(2024, 12, 11, 0, 0, 0)
            .single()
            .unwrap();
        assert_eq!(
            format_relative_date_with_base(different_year, base),
            "Dec 11, 2024"
        );

        assert_eq!(
            format_relative_date_with_base(base + Duration::seconds(2), base),
            "just now"
        );
    }

    #[test]
    fn format_bytes_units() {
        assert_eq!(format_bytes(-5), "0 B");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }
}
