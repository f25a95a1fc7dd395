use serde::{Deserialize, Serialize};

/// Error kinds the router surfaces at its boundary. Each variant maps
/// onto exactly one kind from the taxonomy — the router never lets a raw
/// `anyhow`/provider/storage error escape to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    DbTimeout,
    DbDeadlock,
    DbConnReset,
    ProviderTimeout,
    ProviderUnavailable,
    ProviderQuota,
    ProviderInvalidResponse,
    EmbeddingSpaceMismatch,
    DbIntegrity,
    DbValidation,
    NotFound,
    DataUnavailable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<lendcore_memory::MemoryError> for TurnError {
    fn from(err: lendcore_memory::MemoryError) -> Self {
        let kind = match &err {
            lendcore_memory::MemoryError::ConversationNotFound(_) => ErrorKind::NotFound,
            lendcore_memory::MemoryError::VisibleWindowFull { .. } => ErrorKind::DbValidation,
            lendcore_memory::MemoryError::WriteExhausted { .. } => ErrorKind::DbTimeout,
            lendcore_memory::MemoryError::Storage(_) => ErrorKind::DbIntegrity,
        };
        TurnError { kind, message: err.to_string() }
    }
}

impl From<lendcore_llm::ProviderError> for TurnError {
    fn from(err: lendcore_llm::ProviderError) -> Self {
        let kind = match &err {
            lendcore_llm::ProviderError::Unavailable { .. } => ErrorKind::ProviderUnavailable,
            lendcore_llm::ProviderError::Timeout { .. } => ErrorKind::ProviderTimeout,
            lendcore_llm::ProviderError::Quota { .. } => ErrorKind::ProviderQuota,
            lendcore_llm::ProviderError::InvalidResponse { .. } => ErrorKind::ProviderInvalidResponse,
            lendcore_llm::ProviderError::DimensionMismatch { .. } => ErrorKind::ProviderInvalidResponse,
        };
        TurnError { kind, message: err.to_string() }
    }
}

impl From<lendcore_retrieval::RetrievalError> for TurnError {
    fn from(err: lendcore_retrieval::RetrievalError) -> Self {
        let kind = match &err {
            lendcore_retrieval::RetrievalError::EmbeddingSpaceMismatch { .. } => ErrorKind::EmbeddingSpaceMismatch,
            lendcore_retrieval::RetrievalError::Provider(inner) => match inner {
                lendcore_llm::ProviderError::Unavailable { .. } => ErrorKind::ProviderUnavailable,
                lendcore_llm::ProviderError::Timeout { .. } => ErrorKind::ProviderTimeout,
                lendcore_llm::ProviderError::Quota { .. } => ErrorKind::ProviderQuota,
                lendcore_llm::ProviderError::InvalidResponse { .. } => ErrorKind::ProviderInvalidResponse,
                lendcore_llm::ProviderError::DimensionMismatch { .. } => ErrorKind::ProviderInvalidResponse,
            },
            lendcore_retrieval::RetrievalError::CollectionIo { .. } => ErrorKind::DbIntegrity,
            lendcore_retrieval::RetrievalError::ProviderDimensionMismatch { .. } => ErrorKind::ProviderInvalidResponse,
            lendcore_retrieval::RetrievalError::ConfigMissing(_)
            | lendcore_retrieval::RetrievalError::ConfigParse(_)
            | lendcore_retrieval::RetrievalError::UnknownProvider(_) => ErrorKind::DataUnavailable,
        };
        TurnError { kind, message: err.to_string() }
    }
}
