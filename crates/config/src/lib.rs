use std::env;
use std::fs;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Embedding / generation provider identity.
///
/// Covers a local model host (`ollama`) and a hosted cloud API (`gemini`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub embedding_provider: String,
    pub generation_provider: String,
    pub ollama_base_url: String,
    pub ollama_embed_model: String,
    pub ollama_generate_model: String,
    pub gemini_api_key: String,
    pub gemini_embed_model: String,
    pub gemini_generate_model: String,
    /// Opaque passthrough for the generation provider's reasoning depth.
    /// No documented behavioral contract beyond "pass it to the provider".
    pub thinking_level: String,
    pub provider_timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            embedding_provider: "ollama".to_string(),
            generation_provider: "ollama".to_string(),
            ollama_base_url: "http://localhost:11434".to_string(),
            ollama_embed_model: "nomic-embed-text".to_string(),
            ollama_generate_model: "llama3.1:8b".to_string(),
            gemini_api_key: String::new(),
            gemini_embed_model: "text-embedding-004".to_string(),
            gemini_generate_model: "gemini-1.5-flash".to_string(),
            thinking_level: "balanced".to_string(),
            provider_timeout_secs: 30,
        }
    }
}

/// Retrieval-core settings plus the embedding-space registry's persistence
/// roots.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub default_k: usize,
    pub adaptive_k: bool,
    pub chunk_char_budget: usize,
    pub persistence_root: String,
    pub cache_ttl_secs: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_k: 5,
            adaptive_k: false,
            chunk_char_budget: 6_000,
            persistence_root: ".lendcore/vectors".to_string(),
            cache_ttl_secs: 300,
        }
    }
}

/// Conversation memory & multi-conversation manager settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub max_conversations: usize,
    pub warning_threshold: usize,
    pub summary_window: usize,
    pub context_message_limit: usize,
    pub event_log_path: String,
    pub index_path: String,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_conversations: 20,
            warning_threshold: 15,
            summary_window: 15,
            context_message_limit: 5,
            event_log_path: ".lendcore/messages.jsonl".to_string(),
            index_path: ".lendcore/conversations.redb".to_string(),
        }
    }
}

/// Paths to the three eligibility config documents and the two tabular
/// data sources. Loading is the registry's job; this struct only names
/// where to find them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EligibilityConfig {
    pub checks_catalog_path: String,
    pub reason_rules_path: String,
    pub reason_playbook_path: String,
    pub eligible_customers_path: String,
    pub reasons_file_path: String,
}

impl Default for EligibilityConfig {
    fn default() -> Self {
        Self {
            checks_catalog_path: "data/checks_catalog.json".to_string(),
            reason_rules_path: "data/reason_detection_rules.json".to_string(),
            reason_playbook_path: "data/reason_playbook.json".to_string(),
            eligible_customers_path: "data/eligible_customers.csv".to_string(),
            reasons_file_path: "data/reasons_file.csv".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// The relational storage engine is an external collaborator; this struct
/// only carries what a caller needs to hand one to the core's
/// `ConversationRepository` boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub connection_string: String,
    pub write_retry_attempts: u32,
    pub write_retry_base_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            connection_string: String::new(),
            write_retry_attempts: 3,
            write_retry_base_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    pub total_turn_timeout_secs: u64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            total_turn_timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub providers: ProviderConfig,
    pub retrieval: RetrievalConfig,
    pub memory: MemoryConfig,
    pub eligibility: EligibilityConfig,
    pub telemetry: TelemetryConfig,
    pub database: DatabaseConfig,
    pub router: RouterConfig,
}

impl AppConfig {
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::default();
        if let Ok(raw) = fs::read_to_string(path) {
            config = toml::from_str(&raw)?;
        }

        if let Ok(value) = env::var("OLLAMA_BASE_URL") {
            if !value.is_empty() {
                config.providers.ollama_base_url = value;
            }
        }
        if let Ok(value) = env::var("GEMINI_API_KEY") {
            if !value.is_empty() {
                config.providers.gemini_api_key = value;
            }
        }
        if let Ok(value) = env::var("DATABASE_URL") {
            if !value.is_empty() {
                config.database.connection_string = value;
            }
        }

        Ok(config)
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        let rendered = toml::to_string_pretty(self)?;
        fs::write(path, rendered)?;
        Ok(())
    }

    pub fn active_generation_model(&self) -> &str {
        if self.providers.generation_provider.eq_ignore_ascii_case("gemini") {
            &self.providers.gemini_generate_model
        } else {
            &self.providers.ollama_generate_model
        }
    }

    pub fn active_embedding_model(&self) -> &str {
        if self.providers.embedding_provider.eq_ignore_ascii_case("gemini") {
            &self.providers.gemini_embed_model
        } else {
            &self.providers.ollama_embed_model
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_through_toml() {
        let config = AppConfig::default();
        let rendered = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.memory.max_conversations, config.memory.max_conversations);
        assert_eq!(parsed.retrieval.default_k, 5);
    }

    #[test]
    fn load_from_missing_path_falls_back_to_defaults() {
        let config = AppConfig::load_from("/nonexistent/lendcore.toml").unwrap();
        assert_eq!(config.providers.embedding_provider, "ollama");
    }

    #[test]
    fn active_model_selection_follows_provider() {
        let mut config = AppConfig::default();
        config.providers.generation_provider = "gemini".to_string();
        assert_eq!(config.active_generation_model(), "gemini-1.5-flash");
        config.providers.generation_provider = "ollama".to_string();
        assert_eq!(config.active_generation_model(), "llama3.1:8b");
    }

    #[test]
    fn save_then_load_preserves_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lendcore.toml");
        let mut config = AppConfig::default();
        config.memory.max_conversations = 42;
        config.save_to(&path).unwrap();
        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.memory.max_conversations, 42);
    }
}
