use std::collections::HashMap;
use std::path::PathBuf;

use lendcore_config::{ProviderConfig, RetrievalConfig};

/// Known output dimensionality for the embedding models this workspace
/// ships configuration defaults for. Fresh models must be added here before
/// they can be registered — an unlisted model falls back to 768, the
/// dimensionality both default models already share.
fn known_dimensionality(model: &str) -> usize {
    match model {
        "nomic-embed-text" => 768,
        "text-embedding-004" => 768,
        _ => 768,
    }
}

/// One embedding space: a provider/model pair's collection, persistence
/// path, and self-describing tag.
#[derive(Debug, Clone)]
pub struct EmbeddingSpaceEntry {
    pub provider_id: String,
    pub collection_name: String,
    pub persistence_path: PathBuf,
    pub embedding_space_tag: String,
    pub dimensionality: usize,
}

/// Single source of truth mapping `provider_id` to its embedding space.
/// Both the population flow and the query flow must derive their
/// collection choice from here — never hardcode a path or tag at a call
/// site.
#[derive(Debug, Clone)]
pub struct EmbeddingSpaceRegistry {
    entries: HashMap<String, EmbeddingSpaceEntry>,
}

impl EmbeddingSpaceRegistry {
    pub fn from_config(providers: &ProviderConfig, retrieval: &RetrievalConfig) -> Self {
        let mut entries = HashMap::new();
        let root = PathBuf::from(&retrieval.persistence_root);

        for (provider_id, model) in [
            ("ollama", providers.ollama_embed_model.as_str()),
            ("gemini", providers.gemini_embed_model.as_str()),
        ] {
            let dimensionality = known_dimensionality(model);
            entries.insert(
                provider_id.to_string(),
                EmbeddingSpaceEntry {
                    provider_id: provider_id.to_string(),
                    collection_name: format!("{provider_id}-{model}"),
                    persistence_path: root.join(format!("{provider_id}.bin")),
                    embedding_space_tag: format!("{provider_id}:{model}:dim={dimensionality}"),
                    dimensionality,
                },
            );
        }

        Self { entries }
    }

    pub fn get(&self, provider_id: &str) -> Option<&EmbeddingSpaceEntry> {
        self.entries.get(provider_id)
    }

    pub fn tag(&self, provider_id: &str) -> Option<&str> {
        self.get(provider_id).map(|e| e.embedding_space_tag.as_str())
    }
}
