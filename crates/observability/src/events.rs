use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warn,
    Error,
}

/// Structured event record emitted once per router step. Durably appended
/// before the step returns to its caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityEvent {
    /// ISO 8601 UTC, millisecond precision.
    pub timestamp: DateTime<Utc>,
    pub request_id: String,
    pub component: String,
    pub event_type: String,
    pub severity: Severity,
    pub duration_ms: Option<u64>,
    pub metadata: serde_json::Value,
}

impl ObservabilityEvent {
    pub fn new(
        request_id: impl Into<String>,
        component: impl Into<String>,
        event_type: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            request_id: request_id.into(),
            component: component.into(),
            event_type: event_type.into(),
            severity,
            duration_ms: None,
            metadata: serde_json::json!({}),
        }
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}
