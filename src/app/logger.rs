use std::path::Path;
use std::str::FromStr;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::{Error, Result};

pub const LOG_LEVEL_ENV: &str = "STATPANEL_LOG_LEVEL";

/// Log verbosity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    #[default]
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }

    /// Filter directive: our crate at this level, dependencies at warn.
    pub fn directive(&self) -> String {
        format!("warn,statpanel={}", self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(format!(
                "unknown log level '{other}' (expected error, warn, info, debug or trace)"
            )),
        }
    }
}

/// Keeps the file writer thread alive; drop it last.
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

/// Level from the environment when set, else `requested`.
pub fn effective_level(requested: LogLevel) -> LogLevel {
    std::env::var(LOG_LEVEL_ENV)
        .ok()
        .and_then(|s| LogLevel::from_str(&s).ok())
        .unwrap_or(requested)
}

/// Install the global subscriber: stderr always, plus `log_file` when given.
/// A second call keeps the first subscriber.
pub fn init(level: LogLevel, log_file: Option<&Path>) -> Result<LoggingGuard> {
    let level = effective_level(level);
    let filter = EnvFilter::new(level.directive());

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let file_name = path.file_name().ok_or_else(|| {
                Error::InvalidArgs(format!("log file '{}' has no file name", path.display()))
            })?;
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(file_layer);

    if subscriber.try_init().is_ok() {
        tracing::debug!(level = level.as_str(), "logging initialized");
    }

    Ok(LoggingGuard { _file: guard })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_levels_case_insensitively() {
        assert_eq!("WARNING".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert_eq!("debug".parse::<LogLevel>(), Ok(LogLevel::Debug));
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn directive_scopes_crate_level() {
        assert_eq!(LogLevel::Debug.directive(), "warn,statpanel=debug");
    }

    #[test]
    fn init_with_file_sink_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("statpanel.log");
        let _guard = init(LogLevel::Info, Some(&path)).unwrap();
        assert!(path.parent().unwrap().is_dir());
    }
}
