use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use lendcore_config::MemoryConfig;
use lendcore_llm::GenerationProvider;

use crate::error::{MemoryError, Result};
use crate::event_log::{MessageAppendEvent, MessageEventLog};
use crate::index::ConversationIndex;
use crate::model::{Conversation, ConversationStatus, ConversationSummary, Message, MessageRole};
use crate::store::MessageStore;

const WRITE_RETRY_ATTEMPTS: u32 = 3;
const WRITE_RETRY_BASE: Duration = Duration::from_millis(100);

/// The id of a conversation that was auto-archived to make room for a
/// newly created or reactivated one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct AutoHidden {
    pub conversation_id: Uuid,
}

/// Result of [`ConversationManager::create_conversation`].
#[derive(Debug, Clone)]
pub struct CreatedConversation {
    pub conversation: Conversation,
    pub visible_count: usize,
    pub warning: Option<String>,
    pub auto_hidden: Option<AutoHidden>,
}

/// Ties the event log, in-memory store and redb index together into the
/// conversation memory & multi-conversation manager.
///
/// One [`ConversationManager`] serves every user; visibility and the
/// single-flight-per-user guard are keyed by `user_id`.
pub struct ConversationManager {
    index: ConversationIndex,
    messages_root: PathBuf,
    config: MemoryConfig,
    stores: tokio::sync::Mutex<HashMap<Uuid, MessageStore>>,
    user_locks: std::sync::Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    warned_users: std::sync::Mutex<HashSet<String>>,
}

impl ConversationManager {
    pub fn open(config: MemoryConfig) -> Result<Self> {
        let index = ConversationIndex::open(&config.index_path)?;
        let messages_root = PathBuf::from(&config.event_log_path)
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));
        Ok(Self {
            index,
            messages_root,
            config,
            stores: tokio::sync::Mutex::new(HashMap::new()),
            user_locks: std::sync::Mutex::new(HashMap::new()),
            warned_users: std::sync::Mutex::new(HashSet::new()),
        })
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    fn event_log_for(&self, conversation_id: Uuid) -> MessageEventLog {
        MessageEventLog::new(self.messages_root.join(format!("{conversation_id}.jsonl")))
    }

    async fn lock_for_user(&self, user_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.user_locks.lock().expect("user_locks poisoned");
        locks.entry(user_id.to_string()).or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))).clone()
    }

    /// Relevance order: `last_opened_at` desc, then `last_message_at` desc,
    /// then `created_at` desc.
    fn sort_by_relevance(conversations: &mut [Conversation]) {
        conversations.sort_by(|a, b| {
            b.last_opened_at
                .cmp(&a.last_opened_at)
                .then_with(|| b.last_message_at.cmp(&a.last_message_at))
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
    }

    /// Active (non-archived) conversations for a user, relevance-ordered —
    /// the bounded "visible window".
    pub fn list_visible(&self, user_id: &str) -> Result<Vec<Conversation>> {
        let mut visible: Vec<Conversation> = self
            .index
            .conversations_for_user(user_id)?
            .into_iter()
            .filter(|c| c.status == ConversationStatus::Active)
            .collect();
        Self::sort_by_relevance(&mut visible);
        Ok(visible)
    }

    /// Archive the least-relevant conversation in `visible` other than
    /// `protect`, if any exists. Returns the archived conversation's id.
    fn auto_hide_one(&self, visible: &mut Vec<Conversation>, protect: Option<Uuid>) -> Result<Option<Uuid>> {
        let Some(pos) = visible.iter().rposition(|c| Some(c.id) != protect) else {
            return Ok(None);
        };
        let mut archived = visible.remove(pos);
        archived.status = ConversationStatus::Archived;
        archived.archived_at = Some(Utc::now());
        self.index.upsert_conversation(&archived)?;
        tracing::info!(conversation_id = %archived.id, "auto-archived least-relevant conversation to make room");
        Ok(Some(archived.id))
    }

    /// Create a new conversation for `user_id`. If the visible window is at
    /// capacity, the least-relevant active conversation other than
    /// `active_conversation_id` is auto-archived to make room. Serialized
    /// per-user so concurrent creates can't both observe room for one more
    /// and overflow the window.
    pub async fn create_conversation(
        &self,
        user_id: &str,
        title: Option<String>,
        active_conversation_id: Option<Uuid>,
    ) -> Result<CreatedConversation> {
        let lock = self.lock_for_user(user_id).await;
        let _guard = lock.lock().await;

        let mut visible = self.list_visible(user_id)?;
        let auto_hidden = if visible.len() >= self.config.max_conversations {
            self.auto_hide_one(&mut visible, active_conversation_id)?
                .map(|conversation_id| AutoHidden { conversation_id })
        } else {
            None
        };

        let conversation = Conversation::new(user_id, title);
        self.index.upsert_conversation(&conversation)?;
        let visible_count = visible.len() + 1;

        let warning = if visible_count >= self.config.warning_threshold {
            let mut warned = self.warned_users.lock().expect("warned_users poisoned");
            if warned.insert(user_id.to_string()) {
                tracing::warn!(user_id, visible_count, limit = self.config.max_conversations, "user approaching visible conversation limit");
                Some(format!(
                    "You have {visible_count} open conversations; the limit is {}.",
                    self.config.max_conversations
                ))
            } else {
                None
            }
        } else {
            None
        };

        Ok(CreatedConversation { conversation, visible_count, warning, auto_hidden })
    }

    /// Read-only lookup — does not update `last_opened_at` or reactivate an
    /// archived conversation. Use [`Self::open_conversation`] for that.
    pub fn get_conversation(&self, conversation_id: Uuid) -> Result<Option<Conversation>> {
        Ok(self.index.get_conversation(conversation_id)?)
    }

    /// Open a conversation, reactivating it if it was archived — subject to
    /// the visible-window cap, hiding another conversation if reactivation
    /// would overflow it. 404s if the conversation doesn't exist, or has
    /// been deleted.
    pub async fn open_conversation(&self, conversation_id: Uuid) -> Result<Conversation> {
        let mut conversation = self
            .index
            .get_conversation(conversation_id)?
            .ok_or(MemoryError::ConversationNotFound(conversation_id))?;

        if conversation.status == ConversationStatus::Deleted {
            return Err(MemoryError::ConversationNotFound(conversation_id));
        }

        if conversation.status != ConversationStatus::Active {
            let lock = self.lock_for_user(&conversation.user_id).await;
            let _guard = lock.lock().await;

            let mut visible = self.list_visible(&conversation.user_id)?;
            if visible.len() >= self.config.max_conversations {
                self.auto_hide_one(&mut visible, Some(conversation_id))?;
            }
        }

        conversation.status = ConversationStatus::Active;
        conversation.archived_at = None;
        conversation.last_opened_at = Utc::now();
        self.index.upsert_conversation(&conversation)?;
        Ok(conversation)
    }

    async fn load_store(&self, conversation_id: Uuid) -> Result<()> {
        let mut stores = self.stores.lock().await;
        if stores.contains_key(&conversation_id) {
            return Ok(());
        }
        let log = self.event_log_for(conversation_id);
        let events = log.load().map_err(MemoryError::Storage)?;
        let mut store = MessageStore::default();
        for event in events {
            store.insert(event.message);
        }
        stores.insert(conversation_id, store);
        Ok(())
    }

    /// Append a message, retrying transient write failures with exponential
    /// backoff (100ms, 200ms, 400ms) before giving up.
    pub async fn save_message(
        &self,
        conversation_id: Uuid,
        role: MessageRole,
        content: impl Into<String>,
        request_id: impl Into<String>,
        metadata: serde_json::Value,
    ) -> Result<Message> {
        let message = Message::new(conversation_id, role, content, request_id, metadata);
        let event = MessageAppendEvent { event_id: Uuid::new_v4(), occurred_at: Utc::now(), message: message.clone() };
        let log = self.event_log_for(conversation_id);

        let mut last_err = None;
        for attempt in 0..WRITE_RETRY_ATTEMPTS {
            match log.append(&event).await {
                Ok(()) => {
                    last_err = None;
                    break;
                }
                Err(err) => {
                    tracing::warn!(conversation_id = %conversation_id, attempt, error = %err, "message append failed, retrying");
                    last_err = Some(err);
                    tokio::time::sleep(WRITE_RETRY_BASE * 2u32.pow(attempt)).await;
                }
            }
        }
        if let Some(err) = last_err {
            return Err(MemoryError::WriteExhausted { attempts: WRITE_RETRY_ATTEMPTS, detail: err.to_string() });
        }

        self.load_store(conversation_id).await?;
        {
            let mut stores = self.stores.lock().await;
            stores.entry(conversation_id).or_default().insert(message.clone());
        }

        if let Some(mut conversation) = self.index.get_conversation(conversation_id)? {
            conversation.message_count += 1;
            conversation.last_message_at = Some(message.created_at);
            self.index.upsert_conversation(&conversation)?;
        }

        Ok(message)
    }

    pub async fn last_n_messages(&self, conversation_id: Uuid, n: usize) -> Result<Vec<Message>> {
        self.load_store(conversation_id).await?;
        let stores = self.stores.lock().await;
        Ok(stores.get(&conversation_id).map(|s| s.last_n(n).to_vec()).unwrap_or_default())
    }

    pub async fn messages_paginated(&self, conversation_id: Uuid, offset: usize, limit: usize) -> Result<Vec<Message>> {
        self.load_store(conversation_id).await?;
        let stores = self.stores.lock().await;
        Ok(stores.get(&conversation_id).map(|s| s.paginated(offset, limit).to_vec()).unwrap_or_default())
    }

    pub fn get_summary(&self, conversation_id: Uuid) -> Result<Option<ConversationSummary>> {
        Ok(self.index.get_summary(conversation_id)?)
    }

    pub fn upsert_summary(&self, summary: &ConversationSummary) -> Result<()> {
        Ok(self.index.upsert_summary(summary)?)
    }

    /// Fire-and-forget summary regeneration, triggered every `summary_window`
    /// messages. Errors are logged, never propagated — a stale summary is
    /// not a turn-failing condition.
    pub fn maybe_regenerate_summary(
        self: &Arc<Self>,
        conversation_id: Uuid,
        message_count: u64,
        provider: Arc<dyn GenerationProvider>,
    ) {
        let window = self.config.summary_window as u64;
        if window == 0 || message_count % window != 0 {
            return;
        }
        let manager = self.clone();
        tokio::spawn(async move {
            if let Err(err) = manager.regenerate_summary(conversation_id, provider).await {
                tracing::error!(conversation_id = %conversation_id, error = %err, "summary regeneration failed");
            }
        });
    }

    async fn regenerate_summary(&self, conversation_id: Uuid, provider: Arc<dyn GenerationProvider>) -> Result<()> {
        self.load_store(conversation_id).await?;
        let transcript = {
            let stores = self.stores.lock().await;
            let messages = stores.get(&conversation_id).map(|s| s.all().to_vec()).unwrap_or_default();
            messages.iter().map(|m| format!("{:?}: {}", m.role, m.content)).collect::<Vec<_>>().join("\n")
        };

        let response = provider
            .generate(
                &transcript,
                "Summarize this conversation in 2-3 sentences for later recall.",
                &lendcore_llm::GenerationConfig::default(),
            )
            .await
            .map_err(|err| MemoryError::Storage(err.into()))?;

        let summary = ConversationSummary { conversation_id, text: response.text, version: 1, updated_at: Utc::now() };
        self.upsert_summary(&summary)
    }
}
