use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::json;

use crate::embedding::classify_transport_error;
use crate::error::{ProviderError, Result};

#[derive(Debug, Clone, Default)]
pub struct GenerationConfig {
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct GenerationResponse {
    pub text: String,
    pub usage: Usage,
    pub latency_ms: u64,
    pub metadata: serde_json::Value,
}

/// Capability interface for turning a prompt into text.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    fn provider_id(&self) -> &str;

    async fn generate(
        &self,
        prompt: &str,
        system_instruction: &str,
        config: &GenerationConfig,
    ) -> Result<GenerationResponse>;
}

/// Local generation provider backed by a model served over HTTP by Ollama.
#[derive(Debug, Clone)]
pub struct OllamaGenerationProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl OllamaGenerationProvider {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), base_url: base_url.into(), model: model.into(), timeout: Duration::from_secs(60) }
    }
}

#[async_trait]
impl GenerationProvider for OllamaGenerationProvider {
    fn provider_id(&self) -> &str {
        "ollama"
    }

    async fn generate(
        &self,
        prompt: &str,
        system_instruction: &str,
        config: &GenerationConfig,
    ) -> Result<GenerationResponse> {
        let endpoint = format!("{}/api/generate", self.base_url.trim_end_matches('/'));
        let mut payload = json!({
            "model": self.model,
            "prompt": prompt,
            "system": system_instruction,
            "stream": false,
        });
        if let Some(temperature) = config.temperature {
            payload["options"] = json!({ "temperature": temperature });
        }

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
            return Err(ProviderError::Unavailable { provider: "ollama".to_string(), detail: format!("HTTP {status}") });
        }

        let body: serde_json::Value = response.json().await.map_err(|err| ProviderError::InvalidResponse {
            provider: "ollama".to_string(),
            detail: err.to_string(),
        })?;

        let text = body
            .get("response")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ProviderError::InvalidResponse {
                provider: "ollama".to_string(),
                detail: "response missing 'response' field".to_string(),
            })?
            .to_string();

        let prompt_tokens = body.get("prompt_eval_count").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
        let completion_tokens = body.get("eval_count").and_then(|v| v.as_u64()).unwrap_or(0) as u32;

        Ok(GenerationResponse {
            text,
            usage: Usage { prompt_tokens, completion_tokens },
            latency_ms: started.elapsed().as_millis() as u64,
            metadata: json!({ "model": self.model }),
        })
    }
}

/// Hosted generation provider backed by the Gemini API.
#[derive(Debug, Clone)]
pub struct GeminiGenerationProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl GeminiGenerationProvider {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), api_key: api_key.into(), model: model.into(), timeout: Duration::from_secs(60) }
    }
}

#[async_trait]
impl GenerationProvider for GeminiGenerationProvider {
    fn provider_id(&self) -> &str {
        "gemini"
    }

    async fn generate(
        &self,
        prompt: &str,
        system_instruction: &str,
        config: &GenerationConfig,
    ) -> Result<GenerationResponse> {
        if self.api_key.trim().is_empty() {
            return Err(ProviderError::Unavailable { provider: "gemini".to_string(), detail: "GEMINI_API_KEY not set".to_string() });
        }

        let endpoint = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.model, self.api_key
        );
        let mut payload = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "systemInstruction": { "parts": [{ "text": system_instruction }] },
        });
        let mut generation_config = serde_json::Map::new();
        if let Some(temperature) = config.temperature {
            generation_config.insert("temperature".to_string(), json!(temperature));
        }
        if let Some(max_tokens) = config.max_output_tokens {
            generation_config.insert("maxOutputTokens".to_string(), json!(max_tokens));
        }
        if !generation_config.is_empty() {
            payload["generationConfig"] = serde_json::Value::Object(generation_config);
        }

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
            return Err(ProviderError::Unavailable { provider: "gemini".to_string(), detail: format!("HTTP {status}") });
        }

        let body: serde_json::Value = response.json().await.map_err(|err| ProviderError::InvalidResponse {
            provider: "gemini".to_string(),
            detail: err.to_string(),
        })?;

        let text = body
            .get("candidates")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("content"))
            .and_then(|c| c.get("parts"))
            .and_then(|p| p.get(0))
            .and_then(|p| p.get("text"))
            .and_then(|v| v.as_str())
            .ok_or_else(|| ProviderError::InvalidResponse {
                provider: "gemini".to_string(),
                detail: "response missing candidates[0].content.parts[0].text".to_string(),
            })?
            .to_string();

        let prompt_tokens = body
            .get("usageMetadata")
            .and_then(|u| u.get("promptTokenCount"))
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as u32;
        let completion_tokens = body
            .get("usageMetadata")
            .and_then(|u| u.get("candidatesTokenCount"))
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as u32;

        Ok(GenerationResponse {
            text,
            usage: Usage { prompt_tokens, completion_tokens },
            latency_ms: started.elapsed().as_millis() as u64,
            metadata: json!({ "model": self.model }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn gemini_without_api_key_is_unavailable() {
        let provider = GeminiGenerationProvider::new("", "gemini-1.5-flash");
        let err = provider.generate("hi", "be terse", &GenerationConfig::default()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Unavailable { .. }));
    }

    #[test]
    fn provider_id_identifies_concrete_client() {
        let ollama = OllamaGenerationProvider::new("http://localhost:11434", "llama3.1");
        let gemini = GeminiGenerationProvider::new("key", "gemini-1.5-flash");
        assert_eq!(ollama.provider_id(), "ollama");
        assert_eq!(gemini.provider_id(), "gemini");
    }
}
