//! Input validation for usernames, post text and message text.
//!
//! Lengths are counted in Unicode scalar values, not bytes.

use crate::error::{Result, TwtError};

/// Maximum post length in characters.
pub const MAX_POST_LENGTH: usize = 280;

/// Maximum direct message length in characters.
pub const MAX_MESSAGE_LENGTH: usize = 1000;

pub const MIN_USERNAME_LENGTH: usize = 3;
pub const MAX_USERNAME_LENGTH: usize = 15;

/// Trim and lowercase a username as typed by the user. A leading `@` is dropped.
#[must_use]
pub fn normalize_username(raw: &str) -> String {
    raw.trim().trim_start_matches('@').to_lowercase()
}

/// Normalize and validate a username.
///
/// # Errors
///
/// Returns [`TwtError::Validation`] if the name is not 3-15 ASCII letters,
/// digits or underscores.
pub fn validate_username(raw: &str) -> Result<String> {
    let username = normalize_username(raw);
    let len = username.chars().count();

    if len < MIN_USERNAME_LENGTH {
        return Err(TwtError::validation(format!(
            "username must be at least {MIN_USERNAME_LENGTH} characters"
        )));
    }
    if len > MAX_USERNAME_LENGTH {
        return Err(TwtError::validation(format!(
            "username must be at most {MAX_USERNAME_LENGTH} characters"
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(TwtError::validation(
            "username may only contain letters, digits and underscores",
        ));
    }

    Ok(username)
}

/// Trim and validate post text.
///
/// # Errors
///
/// Returns [`TwtError::Validation`] if the trimmed text is empty or longer
/// than [`MAX_POST_LENGTH`] characters.
pub fn validate_post_text(raw: &str) -> Result<String> {
    validate_text(raw, "post", MAX_POST_LENGTH)
}

/// Trim and validate message text.
///
/// # Errors
///
/// Returns [`TwtError::Validation`] if the trimmed text is empty or longer
/// than [`MAX_MESSAGE_LENGTH`] characters.
pub fn validate_message_text(raw: &str) -> Result<String> {
    validate_text(raw, "message", MAX_MESSAGE_LENGTH)
}

fn validate_text(raw: &str, what: &str, max: usize) -> Result<String> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(TwtError::validation(format!("{what} cannot be empty")));
    }
    let len = text.chars().count();
    if len > max {
        return Err(TwtError::validation(format!(
            "{what} is {len} characters, the limit is {max}"
        )));
    }
    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_is_normalized() {
        assert_eq!(validate_username("  Alice_1 ").unwrap(), "alice_1");
        assert_eq!(validate_username("@Bob").unwrap(), "bob");
    }

    #[test]
    fn username_length_bounds() {
        assert!(validate_username("ab").is_err());
        assert!(validate_username("abc").is_ok());
        assert!(validate_username("a".repeat(15).as_str()).is_ok());
        assert!(validate_username("a".repeat(16).as_str()).is_err());
    }

    #[test]
    fn username_rejects_other_characters() {
        for bad in ["bob smith", "bob-smith", "bob.smith", "bøb"] {
            assert!(
                matches!(validate_username(bad), Err(TwtError::Validation { .. })),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn post_text_is_trimmed() {
        assert_eq!(validate_post_text("  hello  ").unwrap(), "hello");
    }

    #[test]
    fn post_text_rejects_blank() {
        assert!(matches!(
            validate_post_text(" \n\t "),
            Err(TwtError::Validation { .. })
        ));
    }

    #[test]
    fn post_length_counts_characters_not_bytes() {
        let exactly = "é".repeat(MAX_POST_LENGTH);
        assert!(validate_post_text(&exactly).is_ok());

        let over = "a".repeat(MAX_POST_LENGTH + 1);
        assert!(validate_post_text(&over).is_err());

        let padded = format!("  {}  ", "a".repeat(MAX_POST_LENGTH));
        assert_eq!(validate_post_text(&padded).unwrap().len(), MAX_POST_LENGTH);
    }

    #[test]
    fn message_text_has_its_own_limit() {
        assert!(validate_message_text(&"a".repeat(MAX_POST_LENGTH + 1)).is_ok());
        assert!(validate_message_text(&"a".repeat(MAX_MESSAGE_LENGTH + 1)).is_err());
    }
}
