/// Harness - global logging façade for the descriptor harness
///
/// Holds the process-wide logger slot used by the `harness_*!` macros.
/// It uses thread-safe static storage with RwLock so a logger can be
/// swapped at any time (tests install capturing loggers).

use std::sync::{OnceLock, RwLock};
use std::time::SystemTime;
use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};

// ===== INTERNAL STATE =====

/// Global logger state (initialized with DefaultLogger, Info threshold)
static LOGGER: OnceLock<RwLock<LoggerState>> = OnceLock::new();

/// Active logger and the minimum severity it receives
struct LoggerState {
    logger: Box<dyn Logger>,
    min_severity: LogSeverity,
}

impl LoggerState {
    fn new() -> Self {
        Self {
            logger: Box::new(DefaultLogger),
            min_severity: LogSeverity::Info,
        }
    }
}

fn logger_state() -> &'static RwLock<LoggerState> {
    LOGGER.get_or_init(|| RwLock::new(LoggerState::new()))
}

// ===== PUBLIC API =====

/// Global harness façade
///
/// # Example
///
/// ```no_run
/// use descriptor_harness::harness::{Harness, log::{Logger, LogEntry, LogSeverity}};
///
/// struct FileLogger;
/// impl Logger for FileLogger {
///     fn log(&self, entry: &LogEntry) {
///         // Write to file...
///     }
/// }
///
/// Harness::set_logger(FileLogger);
/// Harness::set_min_severity(LogSeverity::Trace);
/// ```
pub struct Harness;

impl Harness {
    /// Replace the current logger
    pub fn set_logger<L: Logger + 'static>(logger: L) {
        if let Ok(mut lock) = logger_state().write() {
            lock.logger = Box::new(logger);
        }
    }

    /// Reset logger to DefaultLogger (the severity threshold is kept)
    pub fn reset_logger() {
        if let Ok(mut lock) = logger_state().write() {
            lock.logger = Box::new(DefaultLogger);
        }
    }

    /// Drop every entry below `severity`
    pub fn set_min_severity(severity: LogSeverity) {
        if let Ok(mut lock) = logger_state().write() {
            lock.min_severity = severity;
        }
    }

    /// Current severity threshold
    pub fn min_severity() -> LogSeverity {
        logger_state()
            .read()
            .map(|lock| lock.min_severity)
            .unwrap_or(LogSeverity::Info)
    }

    /// Internal logging method (for simple logs without file:line)
    ///
    /// Used by macros like harness_info!, harness_warn!, etc.
    pub fn log(severity: LogSeverity, source: &str, message: String) {
        Self::dispatch(severity, source, message, None, None);
    }

    /// Internal logging method with file:line information (for ERROR logs)
    ///
    /// Used by harness_error!, harness_err! and harness_bail!.
    pub fn log_detailed(
        severity: LogSeverity,
        source: &str,
        message: String,
        file: &'static str,
        line: u32,
    ) {
        Self::dispatch(severity, source, message, Some(file), Some(line));
    }

    fn dispatch(
        severity: LogSeverity,
        source: &str,
        message: String,
        file: Option<&'static str>,
        line: Option<u32>,
    ) {
        if let Ok(lock) = logger_state().read() {
            if severity < lock.min_severity {
                return;
            }
            lock.logger.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file,
                line,
            });
        }
    }
}

#[cfg(test)]
#[path = "facade_tests.rs"]
mod tests;
