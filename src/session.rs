//! The acting user for one command.
//!
//! A [`Session`] is resolved once from the configured username and passed to
//! every engine call that acts on someone's behalf.

use crate::error::{Result, TwtError, find_closest_match};
use crate::model::User;
use crate::storage::Storage;
use crate::validation::normalize_username;

/// An authenticated local user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    user: User,
}

impl Session {
    /// Wrap an already loaded user.
    #[must_use]
    pub const fn new(user: User) -> Self {
        Self { user }
    }

    /// Resolve the current username into a session.
    ///
    /// # Errors
    ///
    /// Returns [`TwtError::NotLoggedIn`] if no username is set and
    /// [`TwtError::UserNotFound`] if it no longer resolves.
    pub fn resolve(storage: &Storage, current_user: Option<&str>) -> Result<Self> {
        let username = current_user
            .map(normalize_username)
            .filter(|name| !name.is_empty())
            .ok_or(TwtError::NotLoggedIn)?;

        let user = lookup_user(storage, &username)?;
        Ok(Self { user })
    }

    #[must_use]
    pub const fn user(&self) -> &User {
        &self.user
    }

    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user.id
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.user.username
    }
}

/// Load a user by name, attaching a "did you mean" hint when it is missing.
///
/// # Errors
///
/// Returns [`TwtError::UserNotFound`] if no user has that name.
pub fn lookup_user(storage: &Storage, username: &str) -> Result<User> {
    let username = normalize_username(username);
    if let Some(user) = storage.get_user_by_username(&username)? {
        return Ok(user);
    }

    let known = storage.list_usernames()?;
    let candidates: Vec<&str> = known.iter().map(String::as_str).collect();
    Err(TwtError::UserNotFound {
        suggestion: find_closest_match(&username, &candidates, None).map(str::to_string),
        username,
    })
}
