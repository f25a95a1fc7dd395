use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::json;

use crate::error::{ProviderError, Result};

/// Capability interface for turning text into vectors.
///
/// Implementors declare the embedding space they write into via
/// [`EmbeddingProvider::embedding_space_tag`] and
/// [`EmbeddingProvider::dimensionality`] — the retrieval core asserts both
/// against the embedding-space registry before trusting a result.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn provider_id(&self) -> &str;
    fn embedding_space_tag(&self) -> String {
        format!("{}:{}:dim={}", self.provider_id(), self.model(), self.dimensionality())
    }
    fn model(&self) -> &str;
    fn dimensionality(&self) -> usize;

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>>;
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Local embedding provider backed by a model served over HTTP by Ollama.
#[derive(Debug, Clone)]
pub struct OllamaEmbeddingProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    dimensionality: usize,
    timeout: Duration,
}

impl OllamaEmbeddingProvider {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, dimensionality: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            model: model.into(),
            dimensionality,
            timeout: Duration::from_secs(30),
        }
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let endpoint = format!("{}/api/embeddings", self.base_url.trim_end_matches('/'));
        let payload = json!({ "model": self.model, "prompt": text });

        let started = Instant::now();
        let response = self
            .client
            .post(&endpoint)
            .json(&payload)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|err| classify_transport_error("ollama", err, started))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Unavailable {
                provider: "ollama".to_string(),
                detail: format!("HTTP {status}"),
            });
        }

        let body: serde_json::Value = response.json().await.map_err(|err| ProviderError::InvalidResponse {
            provider: "ollama".to_string(),
            detail: err.to_string(),
        })?;

        let values = body
            .get("embedding")
            .and_then(|v| v.as_array())
            .ok_or_else(|| ProviderError::InvalidResponse {
                provider: "ollama".to_string(),
                detail: "response missing 'embedding' array".to_string(),
            })?;

        let vector: Vec<f32> = values.iter().filter_map(|v| v.as_f64()).map(|v| v as f32).collect();
        assert_dimension("ollama", self.dimensionality, vector.len())?;
        Ok(vector)
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddingProvider {
    fn provider_id(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn dimensionality(&self) -> usize {
        self.dimensionality
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_one(text).await
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed_one(text).await?);
        }
        Ok(vectors)
    }
}

/// Hosted embedding provider backed by Gemini's embedding API.
#[derive(Debug, Clone)]
pub struct GeminiEmbeddingProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    dimensionality: usize,
    timeout: Duration,
}

impl GeminiEmbeddingProvider {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, dimensionality: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            dimensionality,
            timeout: Duration::from_secs(30),
        }
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        if self.api_key.trim().is_empty() {
            return Err(ProviderError::Unavailable {
                provider: "gemini".to_string(),
                detail: "GEMINI_API_KEY not set".to_string(),
            });
        }

        let endpoint = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:embedContent?key={}",
            self.model, self.api_key
        );
        let payload = json!({ "content": { "parts": [{ "text": text }] } });

        let started = Instant::now();
        let response = self
            .client
            .post(&endpoint)
            .json(&payload)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|err| classify_transport_error("gemini", err, started))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::Quota { provider: "gemini".to_string() });
        }
        if !status.is_success() {
            return Err(ProviderError::Unavailable {
                provider: "gemini".to_string(),
                detail: format!("HTTP {status}"),
            });
        }

        let body: serde_json::Value = response.json().await.map_err(|err| ProviderError::InvalidResponse {
            provider: "gemini".to_string(),
            detail: err.to_string(),
        })?;

        let values = body
            .get("embedding")
            .and_then(|e| e.get("values"))
            .and_then(|v| v.as_array())
            .ok_or_else(|| ProviderError::InvalidResponse {
                provider: "gemini".to_string(),
                detail: "response missing embedding.values".to_string(),
            })?;

        let vector: Vec<f32> = values.iter().filter_map(|v| v.as_f64()).map(|v| v as f32).collect();
        assert_dimension("gemini", self.dimensionality, vector.len())?;
        Ok(vector)
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbeddingProvider {
    fn provider_id(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn dimensionality(&self) -> usize {
        self.dimensionality
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_one(text).await
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed_one(text).await?);
        }
        Ok(vectors)
    }
}

pub(crate) fn classify_transport_error(provider: &str, err: reqwest::Error, started: Instant) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout { provider: provider.to_string(), elapsed_ms: started.elapsed().as_millis() as u64 }
    } else {
        ProviderError::Unavailable { provider: provider.to_string(), detail: err.to_string() }
    }
}

fn assert_dimension(provider: &str, expected: usize, actual: usize) -> Result<()> {
    if actual != expected {
        return Err(ProviderError::DimensionMismatch { provider: provider.to_string(), expected, actual });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_space_tag_format() {
        let provider = OllamaEmbeddingProvider::new("http://localhost:11434", "nomic-embed-text", 768);
        assert_eq!(provider.embedding_space_tag(), "ollama:nomic-embed-text:dim=768");
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let err = assert_dimension("ollama", 768, 512).unwrap_err();
        assert!(matches!(err, ProviderError::DimensionMismatch { expected: 768, actual: 512, .. }));
    }

    #[tokio::test]
    async fn gemini_without_api_key_is_unavailable() {
        let provider = GeminiEmbeddingProvider::new("", "text-embedding-004", 768);
        let err = provider.embed_query("hello").await.unwrap_err();
        assert!(matches!(err, ProviderError::Unavailable { .. }));
    }
}
