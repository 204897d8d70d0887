/// Ember3D Engine - singleton manager for engine-wide services
///
/// This module provides global singleton management for the logging system.
/// It uses thread-safe static storage with RwLock for safe concurrent
/// access. Renderer objects are NOT globals in Ember3D: the Vulkan context
/// is passed explicitly to whoever records frames.

use std::sync::{OnceLock, RwLock};
use std::time::SystemTime;
use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};

/// Global logger (initialized with DefaultLogger)
static LOGGER: OnceLock<RwLock<Box<dyn Logger>>> = OnceLock::new();

/// Main engine singleton manager
///
/// Owns the global logger used by the `engine_*!` macros. Applications may
/// replace it with a custom `Logger` implementation before creating the
/// renderer.
///
/// # Example
///
/// ```no_run
/// use ember_3d_engine::ember3d::Engine;
///
/// Engine::initialize();
/// // ... create the Vulkan context, run the frame loop ...
/// Engine::shutdown();
/// ```
pub struct Engine;

impl Engine {
    /// Initialize the engine
    ///
    /// Installs the default logger. Safe to call more than once; later
    /// calls are no-ops.
    pub fn initialize() {
        LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)));
    }

    /// Shutdown the engine
    ///
    /// Resets the logger to the default implementation so that a custom
    /// logger installed by the application can release its resources.
    pub fn shutdown() {
        Self::reset_logger();
    }

    /// Set a custom logger
    ///
    /// Replace the default logger with a custom implementation (file
    /// logger, network logger, etc.)
    ///
    /// # Arguments
    ///
    /// * `logger` - Any type implementing the Logger trait
    ///
    /// # Example
    ///
    /// ```no_run
    /// use ember_3d_engine::ember3d::{Engine};
    /// use ember_3d_engine::ember3d::log::{Logger, LogEntry};
    ///
    /// struct FileLogger;
    /// impl Logger for FileLogger {
    ///     fn log(&self, entry: &LogEntry) {
    ///         // Write to file...
    ///     }
    /// }
    ///
    /// Engine::set_logger(FileLogger);
    /// ```
    pub fn set_logger<L: Logger + 'static>(logger: L) {
        let logger_lock = LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)));
        if let Ok(mut lock) = logger_lock.write() {
            *lock = Box::new(logger);
        }
    }

    /// Reset logger to default (DefaultLogger)
    pub fn reset_logger() {
        let logger_lock = LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)));
        if let Ok(mut lock) = logger_lock.write() {
            *lock = Box::new(DefaultLogger);
        }
    }

    /// Internal logging method (for simple logs without file:line)
    ///
    /// Used by macros like engine_info!, engine_warn!, etc.
    ///
    /// # Arguments
    ///
    /// * `severity` - Log severity level
    /// * `source` - Source module (e.g., "ember3d::Engine")
    /// * `message` - Log message
    pub fn log(severity: LogSeverity, source: &str, message: String) {
        let logger_lock = LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)));
        if let Ok(lock) = logger_lock.read() {
            lock.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file: None,
                line: None,
            });
        }
    }

    /// Internal logging method with file:line information (for ERROR logs)
    ///
    /// Used by the engine_error! and engine_err! macros to include source
    /// location.
    ///
    /// # Arguments
    ///
    /// * `severity` - Log severity level (typically Error)
    /// * `source` - Source module (e.g., "ember3d::vulkan")
    /// * `message` - Log message
    /// * `file` - Source file path
    /// * `line` - Source line number
    pub fn log_detailed(
        severity: LogSeverity,
        source: &str,
        message: String,
        file: &'static str,
        line: u32,
    ) {
        let logger_lock = LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)));
        if let Ok(lock) = logger_lock.read() {
            lock.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file: Some(file),
                line: Some(line),
            });
        }
    }
}
