//! Internal logging system for the descriptor harness
//!
//! This module provides a small pluggable logging layer with:
//! - Customizable logger via Logger trait
//! - Severity levels (Trace, Debug, Info, Warn, Error) with a global minimum filter
//! - Colored console output by default
//! - File and line information for detailed ERROR logs
//!
//! The global logger slot lives in [`Harness`](crate::harness::Harness).

use colored::*;
use std::time::SystemTime;
use chrono::{DateTime, Local};

/// Logger trait for custom logging implementations
///
/// Implement this trait to route harness logs elsewhere (file, test capture, etc.)
///
/// # Example
///
/// ```no_run
/// use descriptor_harness::harness::log::{Logger, LogEntry};
///
/// struct StderrLogger;
///
/// impl Logger for StderrLogger {
///     fn log(&self, entry: &LogEntry) {
///         eprintln!("[{:?}] {}", entry.severity, entry.message);
///     }
/// }
/// ```
pub trait Logger: Send + Sync {
    /// Log an entry
    fn log(&self, entry: &LogEntry);
}

/// Log entry containing all information about a log message
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Severity level
    pub severity: LogSeverity,

    /// Timestamp when the log was created
    pub timestamp: SystemTime,

    /// Source module (e.g., "harness::DescriptorAllocator", "harness::vulkan")
    pub source: String,

    /// Log message
    pub message: String,

    /// Source file (only for detailed ERROR logs)
    pub file: Option<&'static str>,

    /// Source line (only for detailed ERROR logs)
    pub line: Option<u32>,
}

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogSeverity {
    /// Very verbose information (every slot allocation)
    Trace,

    /// Development/debugging information
    Debug,

    /// Important informational messages
    Info,

    /// Warning messages (potential issues)
    Warn,

    /// Error messages (with file:line details)
    Error,
}

impl LogSeverity {
    /// Fixed-width label used by the default logger
    pub fn label(self) -> &'static str {
        match self {
            LogSeverity::Trace => "TRACE",
            LogSeverity::Debug => "DEBUG",
            LogSeverity::Info => "INFO ",
            LogSeverity::Warn => "WARN ",
            LogSeverity::Error => "ERROR",
        }
    }
}

/// Default logger implementation using colored console output
///
/// Format:
/// - Normal: `[timestamp] [SEVERITY] [source] message`
/// - Error: `[timestamp] [ERROR] [source] message (file:line)`
///
/// Warn and Error entries go to stderr, everything else to stdout.
pub struct DefaultLogger;

impl DefaultLogger {
    /// Build the uncolored line for an entry
    pub fn format_entry(entry: &LogEntry) -> String {
        let datetime: DateTime<Local> = entry.timestamp.into();
        let timestamp = datetime.format("%Y-%m-%d %H:%M:%S%.3f");

        match (entry.file, entry.line) {
            (Some(file), Some(line)) => format!(
                "[{}] [{}] [{}] {} ({}:{})",
                timestamp,
                entry.severity.label(),
                entry.source,
                entry.message,
                file,
                line
            ),
            _ => format!(
                "[{}] [{}] [{}] {}",
                timestamp,
                entry.severity.label(),
                entry.source,
                entry.message
            ),
        }
    }
}

impl Logger for DefaultLogger {
    fn log(&self, entry: &LogEntry) {
        let datetime: DateTime<Local> = entry.timestamp.into();
        let timestamp = datetime.format("%Y-%m-%d %H:%M:%S%.3f").to_string();

        let severity_str = match entry.severity {
            LogSeverity::Trace => entry.severity.label().bright_black(),
            LogSeverity::Debug => entry.severity.label().cyan(),
            LogSeverity::Info => entry.severity.label().green(),
            LogSeverity::Warn => entry.severity.label().yellow(),
            LogSeverity::Error => entry.severity.label().red().bold(),
        };
        let source = entry.source.bright_blue();

        let line = match (entry.file, entry.line) {
            (Some(file), Some(line)) => format!(
                "[{}] [{}] [{}] {} ({}:{})",
                timestamp, severity_str, source, entry.message, file, line
            ),
            _ => format!("[{}] [{}] [{}] {}", timestamp, severity_str, source, entry.message),
        };

        if entry.severity >= LogSeverity::Warn {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }
    }
}

// ===== LOGGING MACROS =====

/// Log a TRACE message (very verbose, typically filtered out)
#[macro_export]
macro_rules! harness_trace {
    ($source:expr, $($arg:tt)*) => {
        $crate::harness::Harness::log(
            $crate::harness::log::LogSeverity::Trace,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log a DEBUG message (development information)
#[macro_export]
macro_rules! harness_debug {
    ($source:expr, $($arg:tt)*) => {
        $crate::harness::Harness::log(
            $crate::harness::log::LogSeverity::Debug,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log an INFO message (important events)
///
/// # Example
///
/// ```no_run
/// descriptor_harness::harness_info!("harness::GraphicsSession", "Created {} back buffers", 2);
/// ```
#[macro_export]
macro_rules! harness_info {
    ($source:expr, $($arg:tt)*) => {
        $crate::harness::Harness::log(
            $crate::harness::log::LogSeverity::Info,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log a WARN message (potential issues)
#[macro_export]
macro_rules! harness_warn {
    ($source:expr, $($arg:tt)*) => {
        $crate::harness::Harness::log(
            $crate::harness::log::LogSeverity::Warn,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log an ERROR message with file:line information
#[macro_export]
macro_rules! harness_error {
    ($source:expr, $($arg:tt)*) => {
        $crate::harness::Harness::log_detailed(
            $crate::harness::log::LogSeverity::Error,
            $source,
            format!($($arg)*),
            file!(),
            line!()
        )
    };
}

/// Log an ERROR message and evaluate to `Error::BackendError` with the same text
///
/// Meant for `map_err` / `ok_or_else` closures.
///
/// # Example
///
/// ```ignore
/// device.create_buffer(&info, None)
///     .map_err(|e| harness_err!("harness::vulkan", "Failed to create buffer: {:?}", e))?;
/// ```
#[macro_export]
macro_rules! harness_err {
    ($source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::harness::Harness::log_detailed(
            $crate::harness::log::LogSeverity::Error,
            $source,
            message.clone(),
            file!(),
            line!()
        );
        $crate::harness::Error::BackendError(message)
    }};
}

/// Log an ERROR message and return `Err(Error::BackendError)` from the current function
#[macro_export]
macro_rules! harness_bail {
    ($source:expr, $($arg:tt)*) => {
        return Err($crate::harness_err!($source, $($arg)*))
    };
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
