use lendcore_llm::EmbeddingProvider;

use crate::cache::RetrievalCache;
use crate::error::{RetrievalError, Result};
use crate::registry::EmbeddingSpaceRegistry;
use crate::store::{VectorChunk, VectorDistance, VectorStore};

/// Execute the query-time retrieval pipeline against the active embedding
/// provider:
///
/// 1. Resolve `(collection, path, tag, dimensionality)` from the registry.
/// 2. Embed the query and assert the vector's length against the declared
///    dimensionality (delegated to the provider, which already does this).
/// 3. Open the collection and run top-k search.
/// 4. Assert every returned chunk's `embedding_space_tag` matches the
///    active space — this is the non-negotiable safety invariant.
///
/// `k` of `0` falls back to `default_k`; when `adaptive_k` is set, `k` is
/// widened to `2 * default_k` whenever the first pass returns fewer than
/// `default_k` results, to compensate for a sparse collection.
pub async fn retrieve(
    registry: &EmbeddingSpaceRegistry,
    provider: &dyn EmbeddingProvider,
    cache: Option<&mut RetrievalCache>,
    query_text: &str,
    default_k: usize,
    adaptive_k: bool,
) -> Result<Vec<(VectorChunk, f32)>> {
    let provider_id = provider.provider_id();

    if let Some(cache) = cache {
        if let Some(hit) = cache.get(query_text, provider_id) {
            return Ok(hit);
        }
        let results = retrieve_uncached(registry, provider, query_text, default_k, adaptive_k).await?;
        cache.put(query_text, provider_id, results.clone());
        return Ok(results);
    }

    retrieve_uncached(registry, provider, query_text, default_k, adaptive_k).await
}

async fn retrieve_uncached(
    registry: &EmbeddingSpaceRegistry,
    provider: &dyn EmbeddingProvider,
    query_text: &str,
    default_k: usize,
    adaptive_k: bool,
) -> Result<Vec<(VectorChunk, f32)>> {
    let provider_id = provider.provider_id();
    let entry = registry.get(provider_id).ok_or_else(|| RetrievalError::UnknownProvider(provider_id.to_string()))?;

    let query_vector = provider.embed_query(query_text).await?;
    if query_vector.len() != entry.dimensionality {
        return Err(RetrievalError::ProviderDimensionMismatch {
            provider: provider_id.to_string(),
            expected: entry.dimensionality,
            actual: query_vector.len(),
        });
    }

    let store = VectorStore::open(entry.collection_name.clone(), entry.persistence_path.clone(), VectorDistance::Cosine)?;

    let k = if default_k == 0 { 5 } else { default_k };
    let mut results = store.search(&query_vector, k);
    if adaptive_k && results.len() < k {
        results = store.search(&query_vector, k * 2);
    }

    for (chunk, _) in &results {
        if chunk.embedding_space_tag != entry.embedding_space_tag {
            return Err(RetrievalError::EmbeddingSpaceMismatch {
                chunk_id: chunk.chunk_id.clone(),
                expected: entry.embedding_space_tag.clone(),
                found: chunk.embedding_space_tag.clone(),
            });
        }
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use lendcore_config::{ProviderConfig, RetrievalConfig};
    use lendcore_llm::ProviderError;

    struct FixedEmbeddingProvider {
        id: &'static str,
        vector: Vec<f32>,
    }

    #[async_trait]
    impl EmbeddingProvider for FixedEmbeddingProvider {
        fn provider_id(&self) -> &str {
            self.id
        }
        fn model(&self) -> &str {
            "nomic-embed-text"
        }
        fn dimensionality(&self) -> usize {
            768
        }
        async fn embed_query(&self, _text: &str) -> std::result::Result<Vec<f32>, ProviderError> {
            Ok(self.vector.clone())
        }
        async fn embed_documents(&self, _texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, ProviderError> {
            Ok(vec![self.vector.clone()])
        }
    }

    fn seeded_registry(dir: &std::path::Path) -> (EmbeddingSpaceRegistry, crate::store::VectorChunk) {
        let mut retrieval_config = RetrievalConfig::default();
        retrieval_config.persistence_root = dir.display().to_string();
        let registry = EmbeddingSpaceRegistry::from_config(&ProviderConfig::default(), &retrieval_config);

        let entry = registry.get("ollama").unwrap().clone();
        let chunk = crate::store::VectorChunk {
            chunk_id: "c1".to_string(),
            source_doc: "doc".to_string(),
            page: Some(1),
            content: "hello".to_string(),
            embedding_space_tag: entry.embedding_space_tag.clone(),
        };
        let mut store = VectorStore::open(entry.collection_name.clone(), entry.persistence_path.clone(), VectorDistance::Cosine).unwrap();
        store.upsert(chunk.clone(), vec![1.0; 768]);
        store.persist().unwrap();

        (registry, chunk)
    }

    #[tokio::test]
    async fn retrieve_returns_matching_space_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, chunk) = seeded_registry(dir.path());
        let provider = FixedEmbeddingProvider { id: "ollama", vector: vec![1.0; 768] };

        let results = retrieve(&registry, &provider, None, "hello", 5, false).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0.chunk_id, chunk.chunk_id);
    }

    #[tokio::test]
    async fn mismatched_embedding_space_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, _chunk) = seeded_registry(dir.path());

        let entry = registry.get("ollama").unwrap().clone();
        let mut store = VectorStore::open(entry.collection_name.clone(), entry.persistence_path.clone(), VectorDistance::Cosine).unwrap();
        store.upsert(
            crate::store::VectorChunk {
                chunk_id: "poisoned".to_string(),
                source_doc: "doc".to_string(),
                page: None,
                content: "bad".to_string(),
                embedding_space_tag: "gemini:text-embedding-004:dim=768".to_string(),
            },
            vec![1.0; 768],
        );
        store.persist().unwrap();

        let provider = FixedEmbeddingProvider { id: "ollama", vector: vec![1.0; 768] };
        let err = retrieve(&registry, &provider, None, "hello", 5, false).await.unwrap_err();
        assert!(matches!(err, RetrievalError::EmbeddingSpaceMismatch { .. }));
    }

    #[tokio::test]
    async fn dimension_mismatch_from_provider_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, _chunk) = seeded_registry(dir.path());
        let provider = FixedEmbeddingProvider { id: "ollama", vector: vec![1.0; 3] };
        let err = retrieve(&registry, &provider, None, "hello", 5, false).await.unwrap_err();
        assert!(matches!(err, RetrievalError::ProviderDimensionMismatch { .. }));
    }
}
