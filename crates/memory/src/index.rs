/// Secondary index backed by [`redb`] for per-user conversation lookups and
/// the bounded "visible window".
///
/// The JSONL event log remains the canonical source of truth for messages;
/// this index tracks conversation metadata (status, recency markers, summary)
/// and is rebuildable from scratch if lost or corrupt.
///
/// | Table         | Key                      | Value                          |
/// |---------------|--------------------------|---------------------------------|
/// | `conversations` | conversation UUID (str) | JSON [`IndexedConversation`]   |
/// | `user_index`     | user_id (str)            | newline-separated UUID list    |
/// | `summaries`      | conversation UUID (str) | JSON [`ConversationSummary`]   |
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use redb::{Database, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{Conversation, ConversationStatus, ConversationSummary};

const CONVERSATIONS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("conversations");
const USER_TABLE: TableDefinition<&str, &str> = TableDefinition::new("user_index");
const SUMMARIES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("summaries");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedConversation {
    pub id: Uuid,
    pub user_id: String,
    pub title: Option<String>,
    pub status: ConversationStatus,
    pub message_count: u64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub last_opened_at: chrono::DateTime<chrono::Utc>,
    pub last_message_at: Option<chrono::DateTime<chrono::Utc>>,
    pub archived_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<&Conversation> for IndexedConversation {
    fn from(c: &Conversation) -> Self {
        Self {
            id: c.id,
            user_id: c.user_id.clone(),
            title: c.title.clone(),
            status: c.status,
            message_count: c.message_count,
            created_at: c.created_at,
            last_opened_at: c.last_opened_at,
            last_message_at: c.last_message_at,
            archived_at: c.archived_at,
        }
    }
}

impl IndexedConversation {
    pub fn into_conversation(self) -> Conversation {
        Conversation {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            status: self.status,
            message_count: self.message_count,
            created_at: self.created_at,
            last_opened_at: self.last_opened_at,
            last_message_at: self.last_message_at,
            archived_at: self.archived_at,
        }
    }
}

pub struct ConversationIndex {
    db: Database,
    path: PathBuf,
}

impl ConversationIndex {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(&path)
            .with_context(|| format!("opening redb index at {}", path.display()))?;

        {
            let tx = db.begin_write()?;
            tx.open_table(CONVERSATIONS_TABLE)?;
            tx.open_table(USER_TABLE)?;
            tx.open_table(SUMMARIES_TABLE)?;
            tx.commit()?;
        }

        Ok(Self { db, path })
    }

    pub fn upsert_conversation(&self, conversation: &Conversation) -> Result<()> {
        let id_str = conversation.id.to_string();
        let indexed = IndexedConversation::from(conversation);
        let bytes = serde_json::to_vec(&indexed)?;

        let tx = self.db.begin_write()?;
        {
            let mut tbl = tx.open_table(CONVERSATIONS_TABLE)?;
            let is_new = tbl.get(id_str.as_str())?.is_none();
            tbl.insert(id_str.as_str(), bytes.as_slice())?;

            if is_new {
                let mut user_tbl = tx.open_table(USER_TABLE)?;
                let existing = user_tbl
                    .get(conversation.user_id.as_str())?
                    .map(|v| v.value().to_string())
                    .unwrap_or_default();
                let updated = if existing.is_empty() {
                    id_str.clone()
                } else {
                    format!("{existing}\n{id_str}")
                };
                user_tbl.insert(conversation.user_id.as_str(), updated.as_str())?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn get_conversation(&self, id: Uuid) -> Result<Option<Conversation>> {
        let id_str = id.to_string();
        let tx = self.db.begin_read()?;
        let tbl = tx.open_table(CONVERSATIONS_TABLE)?;
        match tbl.get(id_str.as_str())? {
            None => Ok(None),
            Some(v) => {
                let indexed: IndexedConversation = serde_json::from_slice(v.value())?;
                Ok(Some(indexed.into_conversation()))
            }
        }
    }

    /// All conversations belonging to `user_id`, in no particular order —
    /// callers apply the relevance ordering.
    pub fn conversations_for_user(&self, user_id: &str) -> Result<Vec<Conversation>> {
        let tx = self.db.begin_read()?;
        let user_tbl = tx.open_table(USER_TABLE)?;
        let ids = user_tbl
            .get(user_id)?
            .map(|v| v.value().to_string())
            .unwrap_or_default();
        let conv_tbl = tx.open_table(CONVERSATIONS_TABLE)?;
        let mut out = Vec::new();
        for id in ids.lines().filter(|s| !s.is_empty()) {
            if let Some(v) = conv_tbl.get(id)? {
                let indexed: IndexedConversation = serde_json::from_slice(v.value())?;
                out.push(indexed.into_conversation());
            }
        }
        Ok(out)
    }

    pub fn upsert_summary(&self, summary: &ConversationSummary) -> Result<()> {
        let id_str = summary.conversation_id.to_string();
        let bytes = serde_json::to_vec(summary)?;
        let tx = self.db.begin_write()?;
        {
            let mut tbl = tx.open_table(SUMMARIES_TABLE)?;
            tbl.insert(id_str.as_str(), bytes.as_slice())?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn get_summary(&self, conversation_id: Uuid) -> Result<Option<ConversationSummary>> {
        let id_str = conversation_id.to_string();
        let tx = self.db.begin_read()?;
        let tbl = tx.open_table(SUMMARIES_TABLE)?;
        match tbl.get(id_str.as_str())? {
            None => Ok(None),
            Some(v) => Ok(Some(serde_json::from_slice(v.value())?)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tmp_index() -> (tempfile::TempDir, ConversationIndex) {
        let dir = tempfile::tempdir().unwrap();
        let index = ConversationIndex::open(dir.path().join("index.redb")).unwrap();
        (dir, index)
    }

    #[test]
    fn upsert_then_get_round_trips() {
        let (_dir, index) = tmp_index();
        let conv = Conversation::new("user-1", Some("Loan question".to_string()));
        index.upsert_conversation(&conv).unwrap();

        let fetched = index.get_conversation(conv.id).unwrap().unwrap();
        assert_eq!(fetched.user_id, "user-1");
        assert_eq!(fetched.title.as_deref(), Some("Loan question"));
    }

    #[test]
    fn conversations_for_user_scoped_by_user_id() {
        let (_dir, index) = tmp_index();
        let a = Conversation::new("user-1", None);
        let b = Conversation::new("user-2", None);
        index.upsert_conversation(&a).unwrap();
        index.upsert_conversation(&b).unwrap();

        let for_user1 = index.conversations_for_user("user-1").unwrap();
        assert_eq!(for_user1.len(), 1);
        assert_eq!(for_user1[0].id, a.id);
    }

    #[test]
    fn summary_upsert_and_get() {
        let (_dir, index) = tmp_index();
        let conv = Conversation::new("user-1", None);
        let summary = ConversationSummary {
            conversation_id: conv.id,
            text: "discussed KYC docs".to_string(),
            version: 1,
            updated_at: chrono::Utc::now(),
        };
        index.upsert_summary(&summary).unwrap();
        let fetched = index.get_summary(conv.id).unwrap().unwrap();
        assert_eq!(fetched.text, "discussed KYC docs");
    }
}
