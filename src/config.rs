//! Configuration system for twt.
//!
//! Provides layered configuration from multiple sources:
//!
//! 1. **Compiled defaults** - Sensible defaults built into the binary
//! 2. **User config file** - `$TWT_CONFIG`, else `~/.config/twt/config.toml`
//! 3. **Environment variables** - `TWT_*` prefix
//! 4. **CLI arguments** - Highest priority, always wins
//!
//! The file also remembers who is logged in; `twt login` and `twt logout`
//! rewrite only that key.
//!
//! # Example Configuration File
//!
//! ```toml
//! [paths]
//! db = "~/.local/share/twt/twt.db"
//! media = "~/.local/share/twt/media"
//!
//! [feed]
//! default_limit = 20
//!
//! [output]
//! format = "text"
//! colors = true
//!
//! [session]
//! current_user = "alice"
//! ```

use crate::error::{Result, TwtError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming an alternative config file.
pub const CONFIG_ENV: &str = "TWT_CONFIG";

/// Main configuration structure for twt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub feed: FeedConfig,
    pub output: OutputConfig,
    pub session: SessionConfig,
}

/// Database and media locations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Path to the `SQLite` database file.
    /// Environment variable: `TWT_DB`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db: Option<PathBuf>,

    /// Directory attachments are copied into.
    /// Environment variable: `TWT_MEDIA_DIR`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Posts shown by `twt feed` without `--limit`.
    /// Environment variable: `TWT_LIMIT`
    pub default_limit: usize,
}

/// Output formatting configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format: text, json, json-pretty.
    /// Environment variable: `TWT_FORMAT`
    pub format: String,

    /// Environment variables: `TWT_NO_COLOR`, `NO_COLOR`
    pub colors: bool,
}

/// The logged-in user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Environment variable: `TWT_USER`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_user: Option<String>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self { default_limit: 20 }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "text".to_string(),
            colors: true,
        }
    }
}

impl Config {
    /// Load configuration from defaults, the user file and the environment.
    ///
    /// # Errors
    ///
    /// Returns [`TwtError::ConfigError`] if the config file exists but cannot
    /// be read or parsed.
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = Self::user_config_path() {
            if let Some(file_config) = Self::load_from_file(&path)? {
                config.merge(file_config);
            }
        }

        config.apply_env_overrides(|key| std::env::var(key).ok());

        debug!(?config, "Configuration loaded");
        Ok(config)
    }

    /// Load configuration from a specific file. A missing file is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`TwtError::ConfigError`] if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            debug!("Config file not found: {}", path.display());
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|e| TwtError::ConfigError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let config = toml::from_str(&content).map_err(|e| TwtError::ConfigError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        debug!("Loaded config from: {}", path.display());
        Ok(Some(config))
    }

    /// Get the path to the user configuration file.
    #[must_use]
    pub fn user_config_path() -> Option<PathBuf> {
        std::env::var_os(CONFIG_ENV)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .or_else(|| dirs::config_dir().map(|p| p.join("twt").join("config.toml")))
    }

    /// Apply `TWT_*` overrides read through `var`.
    fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(db) = var("TWT_DB") {
            self.paths.db = Some(PathBuf::from(db));
        }
        if let Some(media) = var("TWT_MEDIA_DIR") {
            self.paths.media = Some(PathBuf::from(media));
        }
        if let Some(user) = var("TWT_USER").filter(|u| !u.trim().is_empty()) {
            self.session.current_user = Some(user);
        }

        if let Some(n) = var("TWT_LIMIT").and_then(|limit| limit.parse().ok()) {
            self.feed.default_limit = n;
        }

        if let Some(format) = var("TWT_FORMAT") {
            self.output.format = format;
        }
        if var("TWT_NO_COLOR").is_some() || var("NO_COLOR").is_some() {
            self.output.colors = false;
        }
    }

    /// Merge another config into this one (other takes precedence).
    fn merge(&mut self, other: Self) {
        if other.paths.db.is_some() {
            self.paths.db = other.paths.db;
        }
        if other.paths.media.is_some() {
            self.paths.media = other.paths.media;
        }
        if other.session.current_user.is_some() {
            self.session.current_user = other.session.current_user;
        }

        self.feed.default_limit = other.feed.default_limit;
        self.output.format = other.output.format;
        self.output.colors = other.output.colors;
    }

    /// Get the database path, using defaults if not configured.
    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.paths.db.clone().unwrap_or_else(crate::default_db_path)
    }

    /// Get the media directory, using defaults if not configured.
    #[must_use]
    pub fn media_dir(&self) -> PathBuf {
        self.paths
            .media
            .clone()
            .unwrap_or_else(crate::default_media_dir)
    }

    /// Persist `username` as the logged-in user, or clear it with `None`.
    ///
    /// Only the file's own contents are rewritten; environment overrides in
    /// effect for this process are not copied into it.
    ///
    /// # Errors
    ///
    /// Returns an error if no config location is known or the file cannot be
    /// read, parsed or written.
    pub fn save_session(username: Option<&str>) -> Result<PathBuf> {
        let path = Self::user_config_path().ok_or_else(|| TwtError::ConfigError {
            path: PathBuf::from("config.toml"),
            reason: "could not determine config directory".into(),
        })?;
        Self::save_session_to(&path, username)?;
        Ok(path)
    }

    /// [`Self::save_session`] against an explicit file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or written.
    pub fn save_session_to(path: &Path, username: Option<&str>) -> Result<()> {
        let mut file_config = Self::load_from_file(path)?.unwrap_or_default();
        file_config.session.current_user = username.map(str::to_string);
        file_config.save_to(path)
    }

    /// Write this configuration to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| TwtError::path_error("create", parent, e))?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| TwtError::ConfigError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        std::fs::write(path, content).map_err(|e| TwtError::path_error("write", path, e))?;
        info!("Saved config to: {}", path.display());
        Ok(())
    }
}
