//! Custom error types for twt.
//!
//! Every engine operation fails with one of a small set of domain kinds
//! (validation, not found, conflict, self reference, forbidden, invalid
//! attachment) so callers can react without string matching.

use std::path::PathBuf;
use thiserror::Error;

/// Primary error type for twt operations.
#[derive(Error, Debug)]
pub enum TwtError {
    // =========================================================================
    // Domain Errors
    // =========================================================================
    /// Input has the wrong shape (empty text, text too long, bad username).
    #[error("Invalid input: {reason}")]
    Validation { reason: String },

    /// Referenced entity does not exist.
    #[error("{item_type} '{id}' not found")]
    NotFound { item_type: &'static str, id: String },

    /// Username does not resolve to a user.
    #[error("User @{username} not found")]
    UserNotFound {
        username: String,
        suggestion: Option<String>,
    },

    /// Entity is absent or belongs to someone else. The two cases are not
    /// distinguished so callers cannot probe for other users' rows.
    #[error("{item_type} '{id}' not found or not owned by you")]
    NotOwned { item_type: &'static str, id: String },

    /// Relationship already exists (double follow, double like, double retweet).
    #[error("{reason}")]
    Conflict { reason: String },

    /// Operation targets the acting user where that is not allowed.
    #[error("You cannot {action} yourself")]
    SelfReference { action: &'static str },

    /// Block or ownership rule prevents the operation.
    #[error("Forbidden: {reason}")]
    Forbidden { reason: String },

    /// Attachment failed image validation.
    #[error("Invalid attachment '{path}': {reason}")]
    InvalidAttachment { path: PathBuf, reason: String },

    /// No active user.
    #[error("Not logged in. Run 'twt login <username>' first.")]
    NotLoggedIn,

    // =========================================================================
    // Database Errors
    // =========================================================================
    /// Database operation failed.
    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    // =========================================================================
    // IO Errors
    // =========================================================================
    /// File read/write error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Path-specific IO error with context.
    #[error("Failed to {operation} '{path}': {source}")]
    PathError {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Configuration file parsing or writing error.
    #[error("Invalid configuration in '{path}': {reason}")]
    ConfigError { path: PathBuf, reason: String },

    // =========================================================================
    // Generic Errors
    // =========================================================================
    /// Catch-all for other errors with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for twt operations.
pub type Result<T> = std::result::Result<T, TwtError>;

impl TwtError {
    /// Create a validation error.
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    /// Create a not found error.
    pub fn not_found(item_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            item_type,
            id: id.into(),
        }
    }

    /// Create a not-found-or-not-owned error.
    pub fn not_owned(item_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotOwned {
            item_type,
            id: id.into(),
        }
    }

    /// Create a conflict error.
    pub fn conflict(reason: impl Into<String>) -> Self {
        Self::Conflict {
            reason: reason.into(),
        }
    }

    /// Create a self reference error. `action` reads as a verb phrase:
    /// "follow", "block", "retweet your own post as", "message".
    pub const fn self_reference(action: &'static str) -> Self {
        Self::SelfReference { action }
    }

    /// Create a forbidden error.
    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden {
            reason: reason.into(),
        }
    }

    /// Create an invalid attachment error.
    pub fn invalid_attachment(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidAttachment {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a path error with context.
    pub fn path_error(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::PathError {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Wrap an error with additional context.
    pub fn with_context<E>(context: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::WithContext {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Short title used when rendering the error in the terminal.
    #[must_use]
    pub const fn title(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "Invalid input",
            Self::NotFound { .. } | Self::UserNotFound { .. } | Self::NotOwned { .. } => {
                "Not found"
            }
            Self::Conflict { .. } => "Already done",
            Self::SelfReference { .. } => "Not allowed on yourself",
            Self::Forbidden { .. } => "Forbidden",
            Self::InvalidAttachment { .. } => "Invalid attachment",
            Self::NotLoggedIn => "Not logged in",
            Self::DatabaseError(_) => "Database error",
            Self::IoError(_) | Self::PathError { .. } => "IO error",
            Self::ConfigError { .. } => "Configuration error",
            Self::WithContext { .. } | Self::Other(_) => "Error",
        }
    }

    /// Get a suggestion for how to fix this error, if applicable.
    #[must_use]
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::NotLoggedIn => Some("Create an account with 'twt user create <username>'.".into()),
            Self::UserNotFound {
                suggestion: Some(name),
                ..
            } => Some(format_did_you_mean(name)),
            Self::UserNotFound { .. } => {
                Some("Usernames are 3-15 letters, digits or underscores.".into())
            }
            Self::InvalidAttachment { .. } => {
                Some("Attach up to 4 JPEG, PNG or GIF images of at most 5 MB each.".into())
            }
            Self::DatabaseError(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::DatabaseBusy =>
            {
                Some("Another twt command is writing. Try again in a moment.".into())
            }
            _ => None,
        }
    }
}

// =============================================================================
// CLI Error Formatting Utilities
// =============================================================================

use colored::Colorize;

/// Format a structured CLI error with explanation and suggestions.
///
/// # Arguments
/// * `title` - Brief error title (e.g., "Not found")
/// * `explanation` - What went wrong and why
/// * `suggestions` - List of actionable suggestions
#[must_use]
pub fn format_error(title: &str, explanation: &str, suggestions: &[&str]) -> String {
    use std::fmt::Write;

    let mut output = format!("{} {}", "✗".red().bold(), title.bold());

    if !explanation.is_empty() {
        let _ = write!(output, "\n\n   {explanation}");
    }

    if !suggestions.is_empty() {
        output.push_str("\n\n   ");
        if suggestions.len() == 1 {
            let _ = write!(output, "{} {}", "Hint:".cyan(), suggestions[0]);
        } else {
            let _ = write!(output, "{}:", "Try".cyan());
            for suggestion in suggestions {
                let _ = write!(output, "\n     {} {}", "•".dimmed(), suggestion);
            }
        }
    }

    output
}

/// Render a [`TwtError`] through [`format_error`].
#[must_use]
pub fn format_twt_error(err: &TwtError) -> String {
    let suggestion = err.suggestion();
    let suggestions: Vec<&str> = suggestion.iter().map(String::as_str).collect();
    format_error(err.title(), &err.to_string(), &suggestions)
}

/// Calculate the Levenshtein edit distance between two strings.
///
/// This is used for "did you mean?" suggestions on mistyped usernames.
#[must_use]
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let a_len = a_chars.len();
    let b_len = b_chars.len();

    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    let mut prev_row: Vec<usize> = (0..=b_len).collect();
    let mut curr_row: Vec<usize> = vec![0; b_len + 1];

    for (i, a_char) in a_chars.iter().enumerate() {
        curr_row[0] = i + 1;

        for (j, b_char) in b_chars.iter().enumerate() {
            let cost = usize::from(a_char != b_char);
            curr_row[j + 1] = (prev_row[j + 1] + 1)
                .min(curr_row[j] + 1)
                .min(prev_row[j] + cost);
        }

        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[b_len]
}

/// Find the closest candidate within `max_distance` edits (default 2).
///
/// Exact matches are not returned; the caller already knows the input failed.
#[must_use]
pub fn find_closest_match<'a>(
    input: &str,
    candidates: &[&'a str],
    max_distance: Option<usize>,
) -> Option<&'a str> {
    let max_dist = max_distance.unwrap_or(2);
    let input_lower = input.to_lowercase();

    candidates
        .iter()
        .map(|&candidate| {
            let distance = levenshtein_distance(&input_lower, &candidate.to_lowercase());
            (candidate, distance)
        })
        .filter(|(_, distance)| *distance <= max_dist && *distance > 0)
        .min_by_key(|(_, distance)| *distance)
        .map(|(candidate, _)| candidate)
}

/// Format a "did you mean?" suggestion.
#[must_use]
pub fn format_did_you_mean(suggestion: &str) -> String {
    format!("Did you mean '@{}'?", suggestion.green())
}
