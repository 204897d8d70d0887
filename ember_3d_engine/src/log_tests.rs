use crate::log::{LogEntry, LogSeverity, Logger, DefaultLogger};
use std::time::SystemTime;

fn make_entry(severity: LogSeverity) -> LogEntry {
    LogEntry {
        severity,
        timestamp: SystemTime::now(),
        source: "ember3d::test".to_string(),
        message: "message".to_string(),
        file: None,
        line: None,
    }
}

#[test]
fn test_severity_ordering() {
    // Severity is ordered so loggers can filter with a simple comparison
    assert!(LogSeverity::Trace < LogSeverity::Debug);
    assert!(LogSeverity::Debug < LogSeverity::Info);
    assert!(LogSeverity::Info < LogSeverity::Warn);
    assert!(LogSeverity::Warn < LogSeverity::Error);
}

#[test]
fn test_default_logger_accepts_all_severities() {
    let logger = DefaultLogger;
    for severity in [
        LogSeverity::Trace,
        LogSeverity::Debug,
        LogSeverity::Info,
        LogSeverity::Warn,
        LogSeverity::Error,
    ] {
        logger.log(&make_entry(severity));
    }
}

#[test]
fn test_default_logger_with_file_line() {
    let logger = DefaultLogger;
    let mut entry = make_entry(LogSeverity::Error);
    entry.file = Some("src/vulkan_context.rs");
    entry.line = Some(42);
    logger.log(&entry);
}

#[test]
fn test_entry_clone_preserves_fields() {
    let mut entry = make_entry(LogSeverity::Warn);
    entry.message = "swap chain suboptimal".to_string();
    let cloned = entry.clone();
    assert_eq!(cloned.severity, LogSeverity::Warn);
    assert_eq!(cloned.source, "ember3d::test");
    assert_eq!(cloned.message, "swap chain suboptimal");
}
