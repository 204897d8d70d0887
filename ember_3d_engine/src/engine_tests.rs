use crate::ember3d::Engine;
use crate::log::{LogEntry, LogSeverity, Logger};
use serial_test::serial;
use std::sync::{Arc, Mutex};

/// Logger that records entries for inspection
struct RecordingLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl Logger for RecordingLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

fn install_recording_logger() -> Arc<Mutex<Vec<LogEntry>>> {
    let entries = Arc::new(Mutex::new(Vec::new()));
    Engine::set_logger(RecordingLogger {
        entries: entries.clone(),
    });
    entries
}

#[test]
#[serial]
fn test_log_reaches_installed_logger() {
    Engine::initialize();
    let entries = install_recording_logger();

    Engine::log(LogSeverity::Info, "ember3d::test", "hello".to_string());

    let recorded = entries.lock().unwrap();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].severity, LogSeverity::Info);
    assert_eq!(recorded[0].source, "ember3d::test");
    assert_eq!(recorded[0].message, "hello");
    assert!(recorded[0].file.is_none());

    drop(recorded);
    Engine::reset_logger();
}

#[test]
#[serial]
fn test_log_detailed_carries_file_and_line() {
    Engine::initialize();
    let entries = install_recording_logger();

    Engine::log_detailed(
        LogSeverity::Error,
        "ember3d::vulkan",
        "failed".to_string(),
        "src/vulkan_context.rs",
        128,
    );

    let recorded = entries.lock().unwrap();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].file, Some("src/vulkan_context.rs"));
    assert_eq!(recorded[0].line, Some(128));

    drop(recorded);
    Engine::reset_logger();
}

#[test]
#[serial]
fn test_engine_err_macro_logs_and_builds_error() {
    Engine::initialize();
    let entries = install_recording_logger();

    let err = crate::engine_err!("ember3d::test", "fence wait failed: {}", 7);
    assert_eq!(format!("{}", err), "Backend error: fence wait failed: 7");

    let recorded = entries.lock().unwrap();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].severity, LogSeverity::Error);
    assert!(recorded[0].line.is_some());

    drop(recorded);
    Engine::reset_logger();
}

#[test]
#[serial]
fn test_shutdown_restores_default_logger() {
    Engine::initialize();
    let entries = install_recording_logger();
    Engine::shutdown();

    // After shutdown the recording logger must no longer receive entries
    Engine::log(LogSeverity::Info, "ember3d::test", "ignored".to_string());
    assert!(entries.lock().unwrap().is_empty());
}
