use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::model::Message;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageAppendEvent {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub message: Message,
}

/// Append-only JSONL log of message-append events, one file per conversation
/// store. Canonical source of truth; [`crate::index::ConversationIndex`] is a
/// rebuildable secondary index over it.
#[derive(Debug, Clone)]
pub struct MessageEventLog {
    path: PathBuf,
}

impl MessageEventLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn append(&self, event: &MessageAppendEvent) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        let line = serde_json::to_string(event)?;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        // Flush userspace buffers and fsync to disk so the entry survives a
        // process crash or power loss immediately after append.
        file.flush().await?;
        file.sync_all().await?;
        Ok(())
    }

    /// Atomically replace the event log with a new set of events.
    ///
    /// Crash-safety guarantee: the new content is written to a `.tmp` sibling
    /// file, `fsync`'d, then renamed over the original. A crash at any point
    /// before the rename leaves the original file untouched. A crash after
    /// the rename leaves a consistent new file. The `.tmp` file is cleaned up
    /// on any error path.
    pub async fn overwrite(&self, events: &[MessageAppendEvent]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp_path = {
            let filename = self
                .path
                .file_name()
                .map(|f| f.to_string_lossy().to_string())
                .unwrap_or_else(|| "messages.jsonl".to_string());
            self.path.with_file_name(format!("{filename}.tmp"))
        };

        let write_result: Result<()> = async {
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp_path)
                .await?;
            for event in events {
                let line = serde_json::to_string(event)?;
                file.write_all(line.as_bytes()).await?;
                file.write_all(b"\n").await?;
            }
            file.flush().await?;
            file.sync_all().await?;
            Ok(())
        }
        .await;

        if let Err(err) = write_result {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(err);
        }

        if let Err(err) = tokio::fs::rename(&tmp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(err.into());
        }

        Ok(())
    }

    /// Copy the live event log to a `.bak` sibling file. No-op if the source
    /// file does not yet exist.
    pub fn backup(&self) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }

        let bak_path = {
            let filename = self
                .path
                .file_name()
                .map(|f| f.to_string_lossy().to_string())
                .unwrap_or_else(|| "messages.jsonl".to_string());
            self.path.with_file_name(format!("{filename}.bak"))
        };

        fs::copy(&self.path, &bak_path)?;
        Ok(())
    }

    pub fn load(&self) -> Result<Vec<MessageAppendEvent>> {
        use std::fs::OpenOptions;
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = OpenOptions::new().read(true).open(&self.path)?;
        let reader = BufReader::new(file);
        let mut events = Vec::new();
        let mut corrupt_count = 0usize;

        for (line_idx, line_result) in reader.lines().enumerate() {
            let line = line_result?;
            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str::<MessageAppendEvent>(&line) {
                Ok(event) => events.push(event),
                Err(err) => {
                    corrupt_count += 1;
                    tracing::warn!(
                        line = line_idx + 1,
                        error = %err,
                        path = %self.path.display(),
                        "corrupt JSONL record — skipping line (original preserved in .corrupt file)"
                    );
                    let corrupt_path = self.path.with_extension("jsonl.corrupt");
                    let mut bad = std::fs::OpenOptions::new()
                        .create(true)
                        .append(true)
                        .open(&corrupt_path)
                        .unwrap_or_else(|_| {
                            std::fs::File::open("/dev/null").expect("/dev/null always exists")
                        });
                    use std::io::Write as _;
                    let _ = writeln!(bad, "{line}");
                }
            }
        }

        if corrupt_count > 0 {
            tracing::warn!(
                corrupt_lines = corrupt_count,
                path = %self.path.display(),
                "event log loaded with skipped corrupt lines — inspect .corrupt sidecar"
            );
        }

        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MessageRole;

    fn sample_event() -> MessageAppendEvent {
        MessageAppendEvent {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            message: Message::new(Uuid::new_v4(), MessageRole::User, "hello", "req-1", serde_json::json!({})),
        }
    }

    #[tokio::test]
    async fn append_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let log = MessageEventLog::new(dir.path().join("messages.jsonl"));
        let event = sample_event();
        log.append(&event).await.unwrap();

        let loaded = log.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].message.content, "hello");
    }

    #[tokio::test]
    async fn corrupt_line_is_skipped_and_sidecared() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("messages.jsonl");
        tokio::fs::write(&path, b"not json\n").await.unwrap();
        let log = MessageEventLog::new(&path);
        let event = sample_event();
        log.append(&event).await.unwrap();

        let loaded = log.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(path.with_extension("jsonl.corrupt").exists());
    }

    #[tokio::test]
    async fn overwrite_replaces_contents_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let log = MessageEventLog::new(dir.path().join("messages.jsonl"));
        log.append(&sample_event()).await.unwrap();
        let replacement = vec![sample_event(), sample_event()];
        log.overwrite(&replacement).await.unwrap();

        let loaded = log.load().unwrap();
        assert_eq!(loaded.len(), 2);
    }
}
