use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    #[error("conversation {0} not found")]
    ConversationNotFound(Uuid),

    #[error("user {user_id} already has {count} visible conversations (limit {limit})")]
    VisibleWindowFull { user_id: String, count: usize, limit: usize },

    #[error("write to event log failed after {attempts} attempts: {detail}")]
    WriteExhausted { attempts: u32, detail: String },

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, MemoryError>;
