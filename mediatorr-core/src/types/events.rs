use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::status::{ScanState, ScanStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

/// Where a log line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStream {
    Stdout,
    Stderr,
    /// Emitted by this process about the scan (spawn, stop requests).
    System,
}

/// One classified line of scan output. The level is fixed when the entry is
/// created and never reinterpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    #[serde(rename = "type")]
    pub stream: LogStream,
}

const ERROR_GLYPH: &str = "\u{274C}";
const WARNING_GLYPH: &str = "\u{26A0}\u{FE0F}";

/// Classify a raw output line. Anything on stderr is an error regardless of
/// its content.
pub fn classify(stream: LogStream, message: &str) -> LogLevel {
    if message.starts_with(ERROR_GLYPH) || stream == LogStream::Stderr {
        LogLevel::Error
    } else if message.starts_with(WARNING_GLYPH) {
        LogLevel::Warning
    } else {
        LogLevel::Info
    }
}

impl LogEntry {
    pub fn new(stream: LogStream, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            timestamp: Utc::now(),
            level: classify(stream, &message),
            message,
            stream,
        }
    }
}

/// Completion reported by the process supervisor when the child exits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessExit {
    pub state: ScanState,
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal: Option<i32>,
    pub timestamp: DateTime<Utc>,
}

impl ProcessExit {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// A scan is reported complete either by the status file flipping to idle
/// or by the child process exiting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScanCompletion {
    ProcessExit(ProcessExit),
    Status(ScanStatus),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScanEvent {
    Log(LogEntry),
    Progress(ScanStatus),
    Complete(ScanCompletion),
}

impl ScanEvent {
    /// Event name used on the wire (SSE `event:` field).
    pub fn event_name(&self) -> &'static str {
        match self {
            ScanEvent::Log(_) => "log",
            ScanEvent::Progress(_) => "scan:progress",
            ScanEvent::Complete(_) => "scan:complete",
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        match self {
            ScanEvent::Log(entry) => serde_json::to_string(entry),
            ScanEvent::Progress(status) => serde_json::to_string(status),
            ScanEvent::Complete(completion) => serde_json::to_string(completion),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_follows_glyphs_and_stream() {
        assert_eq!(
            classify(LogStream::Stdout, "\u{274C} TMDb lookup failed"),
            LogLevel::Error
        );
        assert_eq!(
            classify(LogStream::Stdout, "\u{26A0}\u{FE0F} no poster"),
            LogLevel::Warning
        );
        assert_eq!(
            classify(LogStream::Stderr, "\u{26A0}\u{FE0F} no poster"),
            LogLevel::Error
        );
        assert_eq!(classify(LogStream::Stdout, "processing Heat"), LogLevel::Info);
        assert_eq!(classify(LogStream::System, "scan started"), LogLevel::Info);
    }

    #[test]
    fn log_entry_serializes_stream_as_type() {
        let entry = LogEntry::new(LogStream::Stderr, "boom");
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["type"], "stderr");
        assert_eq!(value["level"], "error");
        assert_eq!(value["message"], "boom");
    }

    #[test]
    fn event_names_match_wire_protocol() {
        let exit = ProcessExit {
            state: ScanState::Idle,
            exit_code: Some(0),
            signal: None,
            timestamp: Utc::now(),
        };
        assert!(exit.success());
        assert_eq!(
            ScanEvent::Complete(ScanCompletion::ProcessExit(exit)).event_name(),
            "scan:complete"
        );
        assert_eq!(
            ScanEvent::Progress(ScanStatus::idle()).event_name(),
            "scan:progress"
        );
    }

    #[test]
    fn process_exit_payload_is_camel_case() {
        let exit = ProcessExit {
            state: ScanState::Idle,
            exit_code: None,
            signal: Some(15),
            timestamp: Utc::now(),
        };
        let json = ScanEvent::Complete(ScanCompletion::ProcessExit(exit))
            .to_json()
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["state"], "idle");
        assert!(value["exitCode"].is_null());
        assert_eq!(value["signal"], 15);
    }
}
