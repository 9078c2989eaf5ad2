//! File logging for campaign-pulse.
//!
//! The dashboard owns the terminal, so every log line goes to a daily file
//! under `$XDG_STATE_HOME/campaign-pulse/`. The configured level applies to
//! our own crates; HTTP and runtime internals stay at `warn` unless `RUST_LOG`
//! says otherwise.

use crate::config::{Config, LoggingConfig};
use crate::error::{Error, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Targets that follow the configured level.
const APP_TARGETS: [&str; 2] = ["campaign_pulse_core", "campaign_pulse"];

/// Keeps the non-blocking writer alive; pending lines are flushed on drop.
pub struct LoggingGuard {
    _worker: WorkerGuard,
}

/// Filter directive for `level`: dependencies at `warn`, our crates at `level`.
pub fn filter_directive(level: &str) -> String {
    let level = level.trim();
    let level = if level.is_empty() { "info" } else { level };
    let mut directive = String::from("warn");
    for target in APP_TARGETS {
        directive.push_str(&format!(",{}={}", target, level));
    }
    directive
}

/// Install the global subscriber writing to the rolling log file.
///
/// `RUST_LOG`, when set, replaces the configured filter entirely.
pub fn init(config: &LoggingConfig) -> Result<LoggingGuard> {
    let log_dir = Config::state_dir();
    std::fs::create_dir_all(&log_dir)?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("campaign-pulse")
        .filename_suffix("log")
        .max_log_files(config.max_files.max(1))
        .build(&log_dir)
        .map_err(|e| Error::Config(format!("cannot open log file in {:?}: {}", log_dir, e)))?;
    let (writer, worker) = tracing_appender::non_blocking(appender);

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(filter_directive(&config.level))
            .map_err(|e| Error::Config(format!("invalid log level {:?}: {}", config.level, e)))?,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_thread_names(true),
        )
        .try_init()
        .map_err(|e| Error::Config(format!("logging already initialized: {}", e)))?;

    tracing::info!(
        log_dir = %log_dir.display(),
        level = %config.level,
        max_files = config.max_files,
        "Logging to file"
    );

    Ok(LoggingGuard { _worker: worker })
}

/// Route logs to the test harness output. Safe to call from every test.
pub fn init_test() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive("debug")));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Log file prefix; the appender adds a date to each file.
pub fn log_file_path() -> PathBuf {
    Config::log_path()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directive_scopes_level_to_app_crates() {
        assert_eq!(
            filter_directive("debug"),
            "warn,campaign_pulse_core=debug,campaign_pulse=debug"
        );
        assert!(EnvFilter::try_new(filter_directive("trace")).is_ok());
    }

    #[test]
    fn test_filter_directive_defaults_blank_level() {
        assert_eq!(
            filter_directive("  "),
            "warn,campaign_pulse_core=info,campaign_pulse=info"
        );
    }

    #[test]
    fn test_log_file_path() {
        assert!(log_file_path().ends_with("campaign-pulse.log"));
    }
}
