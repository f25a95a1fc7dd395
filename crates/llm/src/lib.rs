pub mod embedding;
pub mod error;
pub mod generation;

pub use embedding::{EmbeddingProvider, GeminiEmbeddingProvider, OllamaEmbeddingProvider};
pub use error::{ProviderError, Result};
pub use generation::{
    GenerationConfig, GenerationProvider, GenerationResponse, GeminiGenerationProvider, OllamaGenerationProvider, Usage,
};
