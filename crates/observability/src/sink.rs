use std::path::{Path, PathBuf};

use anyhow::Result;
use tokio::io::AsyncWriteExt;
use tracing::Level;

use crate::events::{ObservabilityEvent, Severity};

/// Durable, append-only JSONL sink for [`ObservabilityEvent`]s, fsync'd on
/// every write so a record survives a crash immediately after the step that
/// emitted it returns. Also mirrors every event onto `tracing` so it shows
/// up in the live log stream without a separate reader.
#[derive(Debug, Clone)]
pub struct EventSink {
    path: PathBuf,
}

impl EventSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn record(&self, event: ObservabilityEvent) -> Result<()> {
        emit_tracing(&event);

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new().create(true).append(true).open(&self.path).await?;
        let line = serde_json::to_string(&event)?;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;
        file.sync_all().await?;
        Ok(())
    }
}

fn emit_tracing(event: &ObservabilityEvent) {
    let level = match event.severity {
        Severity::Info => Level::INFO,
        Severity::Warn => Level::WARN,
        Severity::Error => Level::ERROR,
    };
    match level {
        Level::ERROR => tracing::error!(
            request_id = %event.request_id,
            component = %event.component,
            event_type = %event.event_type,
            duration_ms = event.duration_ms,
            metadata = %event.metadata,
            "observability event"
        ),
        Level::WARN => tracing::warn!(
            request_id = %event.request_id,
            component = %event.component,
            event_type = %event.event_type,
            duration_ms = event.duration_ms,
            metadata = %event.metadata,
            "observability event"
        ),
        _ => tracing::info!(
            request_id = %event.request_id,
            component = %event.component,
            event_type = %event.event_type,
            duration_ms = event.duration_ms,
            metadata = %event.metadata,
            "observability event"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn record_appends_durable_jsonl_line() {
        let dir = tempfile::tempdir().unwrap();
        let sink = EventSink::new(dir.path().join("events.jsonl"));
        let event = ObservabilityEvent::new("req-1", "router", "turn_started", Severity::Info);
        sink.record(event).await.unwrap();

        let contents = tokio::fs::read_to_string(sink.path()).await.unwrap();
        assert_eq!(contents.lines().count(), 1);
        assert!(contents.contains("req-1"));
    }

    #[tokio::test]
    async fn multiple_records_append_without_truncating() {
        let dir = tempfile::tempdir().unwrap();
        let sink = EventSink::new(dir.path().join("events.jsonl"));
        sink.record(ObservabilityEvent::new("req-1", "router", "turn_started", Severity::Info)).await.unwrap();
        sink.record(ObservabilityEvent::new("req-2", "router", "turn_started", Severity::Info)).await.unwrap();

        let contents = tokio::fs::read_to_string(sink.path()).await.unwrap();
        assert_eq!(contents.lines().count(), 2);
    }
}
