//! Alert sinks. Delivery failures are logged and dropped.

use crate::ports::alert_port::AlertSink;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use tracing::{info, warn};

/// Writes each alert to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAlertSink;

impl AlertSink for LogAlertSink {
    fn notify(&self, text: &str) {
        info!(target: "alert", "{text}");
    }
}

/// Appends one line per alert to a file.
#[derive(Debug, Clone)]
pub struct FileAlertSink {
    path: PathBuf,
}

impl FileAlertSink {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl AlertSink for FileAlertSink {
    fn notify(&self, text: &str) {
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| writeln!(file, "{text}"));
        if let Err(e) = result {
            warn!(path = %self.path.display(), error = %e, "alert delivery failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn file_sink_appends_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("alerts.log");
        let sink = FileAlertSink::new(path.clone());

        sink.notify("2024-01-02 BUY 600519 x100 @ 1700.00");
        sink.notify("2024-01-09 SELL 600519 x100 @ 1750.00 (take_profit) profit 4894.75");

        let content = std::fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("BUY 600519"));
        assert!(lines[1].contains("take_profit"));
    }

    #[test]
    fn file_sink_swallows_failures() {
        let dir = TempDir::new().unwrap();
        let sink = FileAlertSink::new(dir.path().join("missing").join("alerts.log"));
        sink.notify("dropped");
        assert!(!dir.path().join("missing").exists());
    }

    #[test]
    fn log_sink_accepts_any_text() {
        LogAlertSink.notify("hello");
    }
}
