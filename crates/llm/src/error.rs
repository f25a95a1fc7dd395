use thiserror::Error;

/// Runtime provider-call failure taxonomy: the only four ways an embedding
/// or generation call is allowed to fail.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider '{provider}' unavailable: {detail}")]
    Unavailable { provider: String, detail: String },
    #[error("provider '{provider}' timed out after {elapsed_ms}ms")]
    Timeout { provider: String, elapsed_ms: u64 },
    #[error("provider '{provider}' quota exceeded")]
    Quota { provider: String },
    #[error("provider '{provider}' returned an invalid response: {detail}")]
    InvalidResponse { provider: String, detail: String },
    /// Startup-fatal: the embedding vector's length didn't match the
    /// registry's declared dimensionality for this provider.
    #[error("provider '{provider}' declared dimension {expected} but returned {actual}")]
    DimensionMismatch { provider: String, expected: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, ProviderError>;
