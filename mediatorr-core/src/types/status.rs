use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanState {
    Running,
    Idle,
    #[serde(other)]
    Unknown,
}

impl ScanState {
    fn from_value(value: Option<&Value>) -> Self {
        match value.and_then(Value::as_str) {
            Some("running") => ScanState::Running,
            Some("idle") => ScanState::Idle,
            _ => ScanState::Unknown,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            ScanState::Running => "running",
            ScanState::Idle => "idle",
            ScanState::Unknown => "unknown",
        }
    }
}

const STATE_FIELD: &str = "state";
const STOPPED_MANUALLY_FIELD: &str = "stoppedManually";
const LAST_SCAN_FIELD: &str = "lastScan";

/// Contents of the shared status file written by the external scan job.
///
/// The document is kept as the job wrote it. Only `state` is interpreted, so
/// two statuses compare equal only when the whole document is equal and a
/// field in an unexpected shape never hides an update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScanStatus {
    fields: Map<String, Value>,
}

impl ScanStatus {
    pub fn idle() -> Self {
        let mut fields = Map::new();
        fields.insert(
            STATE_FIELD.to_string(),
            Value::String(ScanState::Idle.as_str().to_string()),
        );
        Self { fields }
    }

    /// `Unknown` when `state` is missing, not a string or unrecognised.
    pub fn state(&self) -> ScanState {
        ScanState::from_value(self.fields.get(STATE_FIELD))
    }

    pub fn is_running(&self) -> bool {
        self.state() == ScanState::Running
    }

    pub fn stopped_manually_flag(&self) -> bool {
        self.fields
            .get(STOPPED_MANUALLY_FIELD)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Status written when an operator stops the scan: the previous document
    /// with its state forced to idle and the manual-stop flag raised.
    pub fn stopped_manually(previous: Option<ScanStatus>) -> Self {
        let mut status = previous.unwrap_or_else(Self::idle);
        status.fields.insert(
            STATE_FIELD.to_string(),
            Value::String(ScanState::Idle.as_str().to_string()),
        );
        status
            .fields
            .insert(STOPPED_MANUALLY_FIELD.to_string(), Value::Bool(true));
        status.fields.insert(
            LAST_SCAN_FIELD.to_string(),
            Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        status
    }
}

impl Default for ScanStatus {
    fn default() -> Self {
        Self::idle()
    }
}
