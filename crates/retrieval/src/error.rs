use thiserror::Error;

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("config file missing: {0}")]
    ConfigMissing(String),
    #[error("config parse error: {0}")]
    ConfigParse(String),
    #[error("unknown provider id: {0}")]
    UnknownProvider(String),
    #[error("provider '{provider}' declared dimension {expected} but produced {actual}")]
    ProviderDimensionMismatch { provider: String, expected: usize, actual: usize },
    #[error("chunk '{chunk_id}' embedding_space_tag '{found}' does not match active space '{expected}'")]
    EmbeddingSpaceMismatch { chunk_id: String, expected: String, found: String },
    #[error("failed to read collection at {path}: {detail}")]
    CollectionIo { path: String, detail: String },
    #[error(transparent)]
    Provider(#[from] lendcore_llm::ProviderError),
}

pub type Result<T> = std::result::Result<T, RetrievalError>;
