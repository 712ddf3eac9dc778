//! Leveled console logging.
//!
//! Entries are timestamped and written to stderr so stdout stays free for
//! command output. The minimum level comes from `CLEANING_LOG`
//! (`info`, `warning`, `error` or `off`).

use chrono::Local;
use once_cell::sync::Lazy;
use std::env;

/// Log level for display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl LogLevel {
    /// Severity used for threshold filtering; success ranks with info.
    fn rank(self) -> u8 {
        match self {
            LogLevel::Info | LogLevel::Success => 0,
            LogLevel::Warning => 1,
            LogLevel::Error => 2,
        }
    }
}

/// A single log entry
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    /// Nesting level for sub-steps
    pub indent: u8,
}

impl LogEntry {
    pub fn info(message: impl Into<String>) -> Self {
        Self { level: LogLevel::Info, message: message.into(), indent: 0 }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self { level: LogLevel::Success, message: message.into(), indent: 0 }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self { level: LogLevel::Warning, message: message.into(), indent: 0 }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: LogLevel::Error, message: message.into(), indent: 0 }
    }

    pub fn with_indent(mut self, indent: u8) -> Self {
        self.indent = indent;
        self
    }

    /// Console line without timestamp.
    pub fn render(&self) -> String {
        let prefix = match self.level {
            LogLevel::Info => "  ",
            LogLevel::Success => "✓ ",
            LogLevel::Warning => "⚠️ ",
            LogLevel::Error => "❌",
        };
        format!("{}{} {}", "   ".repeat(self.indent as usize), prefix, self.message)
    }
}

/// Global logger
pub static LOGGER: Lazy<Logger> = Lazy::new(Logger::from_env);

/// Writes entries at or above a minimum level.
pub struct Logger {
    /// `None` silences everything.
    min_rank: Option<u8>,
}

impl Logger {
    /// Logger with an explicit threshold.
    pub fn new(min_level: Option<LogLevel>) -> Self {
        Self { min_rank: min_level.map(LogLevel::rank) }
    }

    /// Threshold from `CLEANING_LOG`, defaulting to info.
    pub fn from_env() -> Self {
        Self::new(parse_level(&env::var("CLEANING_LOG").unwrap_or_default()))
    }

    pub fn enabled(&self, level: LogLevel) -> bool {
        self.min_rank.is_some_and(|min| level.rank() >= min)
    }

    pub fn log(&self, entry: LogEntry) {
        if !self.enabled(entry.level) {
            return;
        }
        eprintln!("{} {}", Local::now().format("%Y-%m-%d %H:%M:%S,%3f"), entry.render());
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(Some(LogLevel::Info))
    }
}

/// Parse a `CLEANING_LOG` value. Unknown values mean info.
fn parse_level(value: &str) -> Option<LogLevel> {
    match value.trim().to_lowercase().as_str() {
        "off" | "none" => None,
        "error" => Some(LogLevel::Error),
        "warning" | "warn" => Some(LogLevel::Warning),
        _ => Some(LogLevel::Info),
    }
}

/// Convenient logging functions
pub fn log_info(msg: impl Into<String>) {
    LOGGER.log(LogEntry::info(msg));
}

pub fn log_success(msg: impl Into<String>) {
    LOGGER.log(LogEntry::success(msg));
}

pub fn log_warning(msg: impl Into<String>) {
    LOGGER.log(LogEntry::warning(msg));
}

pub fn log_info_indent(msg: impl Into<String>, indent: u8) {
    LOGGER.log(LogEntry::info(msg).with_indent(indent));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold() {
        let logger = Logger::new(Some(LogLevel::Warning));
        assert!(!logger.enabled(LogLevel::Info));
        assert!(!logger.enabled(LogLevel::Success));
        assert!(logger.enabled(LogLevel::Warning));
        assert!(logger.enabled(LogLevel::Error));

        assert!(!Logger::new(None).enabled(LogLevel::Error));
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level(""), Some(LogLevel::Info));
        assert_eq!(parse_level("WARN"), Some(LogLevel::Warning));
        assert_eq!(parse_level("error"), Some(LogLevel::Error));
        assert_eq!(parse_level("off"), None);
    }

    #[test]
    fn test_render_indent() {
        let line = LogEntry::success("Published clean_sample.csv:v0").with_indent(1).render();
        assert!(line.starts_with("   ✓"));
        assert!(line.ends_with("Published clean_sample.csv:v0"));

        assert!(LogEntry::error("boom").render().starts_with("❌"));
    }
}
