//! Diagnostic logging for twt.
//!
//! Command output goes to stdout; log lines always go to stderr so they never
//! mix with rendered posts or JSON. The default level is `warn`, which keeps
//! best-effort failures (an attachment that could not be copied, a
//! notification that could not be written) visible.
//!
//! ```rust
//! use twt::logging::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::default());
//! tracing::warn!("shown on stderr");
//! ```

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    /// Include timestamps in log output.
    pub timestamps: bool,
    /// Include the module path of each event.
    pub target: bool,
    pub colors: bool,
}

/// Log level configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
    Off,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, human oriented.
    Pretty,
    /// Single line per event.
    Compact,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Warn,
            format: LogFormat::Compact,
            timestamps: false,
            target: false,
            colors: true,
        }
    }
}

impl LogConfig {
    /// Errors only.
    #[must_use]
    pub const fn quiet() -> Self {
        Self {
            level: LogLevel::Error,
            format: LogFormat::Compact,
            timestamps: false,
            target: false,
            colors: true,
        }
    }

    /// `-v`: info-level events such as migrations and committed writes.
    #[must_use]
    pub const fn verbose() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            timestamps: true,
            target: false,
            colors: true,
        }
    }

    /// `-vv` and beyond: every query and lookup.
    #[must_use]
    pub const fn debug() -> Self {
        Self {
            level: LogLevel::Debug,
            format: LogFormat::Pretty,
            timestamps: true,
            target: true,
            colors: true,
        }
    }

    #[must_use]
    pub const fn with_colors(mut self, colors: bool) -> Self {
        self.colors = colors;
        self
    }
}

impl LogLevel {
    /// Convert to env filter directive string.
    const fn to_filter_string(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
            Self::Off => "off",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" | "e" => Ok(Self::Error),
            "warn" | "warning" | "w" => Ok(Self::Warn),
            "info" | "i" => Ok(Self::Info),
            "debug" | "d" => Ok(Self::Debug),
            "trace" | "t" => Ok(Self::Trace),
            "off" | "none" | "quiet" => Ok(Self::Off),
            _ => Err(format!("Invalid log level: {s}")),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" | "p" => Ok(Self::Pretty),
            "compact" | "c" => Ok(Self::Compact),
            _ => Err(format!("Invalid log format: {s}")),
        }
    }
}

fn env_filter(level: LogLevel) -> EnvFilter {
    if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(format!("twt={}", level.to_filter_string()))
    }
}

/// Initialize the global subscriber. Later calls are ignored.
///
/// `RUST_LOG`, when set, replaces the configured level.
pub fn init_logging(config: &LogConfig) {
    let filter = env_filter(config.level);
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(config.colors)
        .with_target(config.target);

    match (config.format, config.timestamps) {
        (LogFormat::Pretty, true) => {
            let layer = layer.pretty();
            tracing_subscriber::registry().with(filter).with(layer).try_init().ok();
        }
        (LogFormat::Pretty, false) => {
            let layer = layer.pretty().without_time();
            tracing_subscriber::registry().with(filter).with(layer).try_init().ok();
        }
        (LogFormat::Compact, true) => {
            let layer = layer.compact();
            tracing_subscriber::registry().with(filter).with(layer).try_init().ok();
        }
        (LogFormat::Compact, false) => {
            let layer = layer.compact().without_time();
            tracing_subscriber::registry().with(filter).with(layer).try_init().ok();
        }
    }
}

/// Initialize logging from the CLI's `-q` and `-v` flags.
pub fn init_cli_logging(quiet: bool, verbose: u8, colors: bool) {
    let config = if quiet {
        LogConfig::quiet()
    } else {
        match verbose {
            0 => LogConfig::default(),
            1 => LogConfig::verbose(),
            _ => LogConfig::debug(),
        }
    };
    init_logging(&config.with_colors(colors));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_from_str() {
        assert_eq!("error".parse::<LogLevel>().unwrap(), LogLevel::Error);
        assert_eq!("WARNING".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("i".parse::<LogLevel>().unwrap(), LogLevel::Info);
        assert_eq!("off".parse::<LogLevel>().unwrap(), LogLevel::Off);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert_eq!("c".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert!("full".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_default_is_warn_without_timestamps() {
        let config = LogConfig::default();
        assert_eq!(config.level, LogLevel::Warn);
        assert!(!config.timestamps);
        assert!(!config.with_colors(false).colors);
    }

    #[test]
    fn test_presets_escalate() {
        assert_eq!(LogConfig::quiet().level, LogLevel::Error);
        assert_eq!(LogConfig::verbose().level, LogLevel::Info);
        assert_eq!(LogConfig::debug().level, LogLevel::Debug);
        assert_eq!(LogLevel::Debug.to_filter_string(), "debug");
    }
}
