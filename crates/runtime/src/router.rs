use std::sync::Arc;
use std::time::Instant;

use uuid::Uuid;

use lendcore_config::{MemoryConfig, RetrievalConfig};
use lendcore_eligibility::{assemble, extract, intent, EligibilityRegistry};
use lendcore_llm::{EmbeddingProvider, GenerationConfig, GenerationProvider};
use lendcore_memory::{ConversationManager, MessageRole};
use lendcore_observability::{EventSink, ObservabilityEvent, Severity};
use lendcore_prompt::{self as prompt, HistoryTurn, PromptInputs};
use lendcore_retrieval::{retrieve, EmbeddingSpaceRegistry, RetrievalCache};

use crate::error::{ErrorKind, TurnError};

const ELIGIBILITY_SYSTEM_PROMPT: &str = "You are a bank staff assistant. Render the eligibility JSON you are given as the frozen UI v1.1 text format: \
Customer Name / Account Number / Status, then a 'Reasons' block numbered in source order with inline parenthetical evidence and a 'Next Steps' list per reason, \
separated by '---', and '==================== NEXT ACCOUNT ====================' between accounts. Never emit tables or raw reason codes.";

#[derive(Debug, Clone, serde::Serialize)]
pub struct TurnResponse {
    pub response: String,
    pub sources: Option<Vec<String>>,
    pub is_eligibility_flow: bool,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct TurnFailure {
    pub error: TurnError,
    pub request_id: String,
}

pub type TurnOutcome = Result<TurnResponse, TurnFailure>;

/// Deterministic per-turn pipeline: save the user message, branch on
/// intent to the eligibility flow or the RAG flow, save the assistant
/// message, and fire off summary regeneration in the background. Never
/// raises to its caller — every failure becomes a [`TurnFailure`].
pub struct Router {
    eligibility: Arc<EligibilityRegistry>,
    conversations: Arc<ConversationManager>,
    embedding_registry: Arc<EmbeddingSpaceRegistry>,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    generation_provider: Arc<dyn GenerationProvider>,
    retrieval_cache: tokio::sync::Mutex<RetrievalCache>,
    retrieval_config: RetrievalConfig,
    memory_config: MemoryConfig,
    events: EventSink,
}

impl Router {
    pub fn new(
        eligibility: Arc<EligibilityRegistry>,
        conversations: Arc<ConversationManager>,
        embedding_registry: Arc<EmbeddingSpaceRegistry>,
        embedding_provider: Arc<dyn EmbeddingProvider>,
        generation_provider: Arc<dyn GenerationProvider>,
        retrieval_config: RetrievalConfig,
        memory_config: MemoryConfig,
        events: EventSink,
    ) -> Self {
        let cache_capacity = 256;
        let ttl = std::time::Duration::from_secs(retrieval_config.cache_ttl_secs);
        Self {
            eligibility,
            conversations,
            embedding_registry,
            embedding_provider,
            generation_provider,
            retrieval_cache: tokio::sync::Mutex::new(RetrievalCache::new(cache_capacity, ttl)),
            retrieval_config,
            memory_config,
            events,
        }
    }

    pub async fn turn(&self, user_id: &str, conversation_id: Uuid, text: &str, request_id: &str) -> TurnOutcome {
        let started = Instant::now();
        self.emit(request_id, "router", "turn_started", Severity::Info, None, serde_json::json!({"user_id_hash": lendcore_observability::hash_text(user_id)})).await;

        let outcome = self.run_turn(user_id, conversation_id, text, request_id).await;

        match &outcome {
            Ok(_) => {
                self.emit(request_id, "router", "turn_completed", Severity::Info, Some(started.elapsed().as_millis() as u64), serde_json::json!({})).await;
            }
            Err(failure) => {
                self.emit(
                    request_id,
                    "router",
                    "turn_failed",
                    Severity::Error,
                    Some(started.elapsed().as_millis() as u64),
                    serde_json::json!({"kind": failure.error.kind, "text_hash": lendcore_observability::hash_text(text)}),
                )
                .await;
            }
        }
        outcome
    }

    async fn run_turn(&self, user_id: &str, conversation_id: Uuid, text: &str, request_id: &str) -> TurnOutcome {
        let _ = user_id;
        self.conversations
            .save_message(conversation_id, MessageRole::User, text, request_id, serde_json::json!({}))
            .await
            .map_err(|err| self.failure(request_id, err.into()))?;

        let detection = intent::detect(text);
        let (response_text, sources, is_eligibility_flow, metadata) = if detection.is_eligibility_query {
            self.eligibility_flow(text, request_id).await?
        } else {
            self.rag_flow(conversation_id, text, request_id).await?
        };

        self.conversations
            .save_message(
                conversation_id,
                MessageRole::Assistant,
                &response_text,
                request_id,
                serde_json::json!({"sources": sources, "is_eligibility_flow": is_eligibility_flow}),
            )
            .await
            .map_err(|err| self.failure(request_id, err.into()))?;

        if let Ok(Some(conversation)) = self.conversations.get_conversation(conversation_id) {
            self.conversations.maybe_regenerate_summary(conversation_id, conversation.message_count, self.generation_provider.clone());
        }

        Ok(TurnResponse { response: response_text, sources, is_eligibility_flow, metadata })
    }

    async fn eligibility_flow(&self, text: &str, request_id: &str) -> Result<(String, Option<Vec<String>>, bool, serde_json::Value), TurnFailure> {
        let candidates = extract::extract_accounts(text);
        let (valid, invalid) = extract::validate(candidates);

        self.emit(
            request_id,
            "eligibility",
            "accounts_extracted",
            Severity::Info,
            None,
            serde_json::json!({"valid_count": valid.len(), "invalid_count": invalid.len()}),
        )
        .await;

        if valid.is_empty() {
            return Ok((
                "Please provide a 10-digit account number so I can check eligibility.".to_string(),
                None,
                true,
                serde_json::json!({}),
            ));
        }

        let started = Instant::now();
        let payload = assemble(&self.eligibility, request_id, &valid, &invalid, started);
        let payload_json = serde_json::to_string(&payload).map_err(|err| self.failure(request_id, TurnError { kind: ErrorKind::DbValidation, message: err.to_string() }))?;

        let response = self
            .generation_provider
            .generate(&payload_json, ELIGIBILITY_SYSTEM_PROMPT, &GenerationConfig::default())
            .await
            .map_err(|err| self.failure(request_id, err.into()))?;

        Ok((response.text, None, true, serde_json::json!({"latency_ms": response.latency_ms})))
    }

    async fn rag_flow(&self, conversation_id: Uuid, text: &str, request_id: &str) -> Result<(String, Option<Vec<String>>, bool, serde_json::Value), TurnFailure> {
        let summary = self.conversations.get_summary(conversation_id).map_err(|err| self.failure(request_id, err.into()))?;
        let history_limit = self.memory_config.context_message_limit;
        let history_messages = self
            .conversations
            .last_n_messages(conversation_id, history_limit)
            .await
            .map_err(|err| self.failure(request_id, err.into()))?;
        let history: Vec<HistoryTurn> = history_messages
            .iter()
            .map(|m| HistoryTurn { role: format!("{:?}", m.role).to_lowercase(), content: m.content.clone() })
            .collect();

        let mut cache = self.retrieval_cache.lock().await;
        let chunks = retrieve(
            &self.embedding_registry,
            self.embedding_provider.as_ref(),
            Some(&mut cache),
            text,
            self.retrieval_config.default_k,
            self.retrieval_config.adaptive_k,
        )
        .await
        .map_err(|err| self.failure(request_id, err.into()))?;
        drop(cache);

        let composed = prompt::build(&PromptInputs {
            prompt_version: "v1",
            summary: summary.as_ref().map(|s| s.text.as_str()),
            history: &history,
            chunks: &chunks,
            user_query: text,
            chunk_char_budget: self.retrieval_config.chunk_char_budget,
        });

        let response = self
            .generation_provider
            .generate(&composed.user_prompt, &composed.system_instruction, &GenerationConfig::default())
            .await
            .map_err(|err| self.failure(request_id, err.into()))?;

        let sources: Vec<String> = chunks.iter().map(|(chunk, _)| chunk.source_doc.clone()).collect();
        let metadata = serde_json::json!({"latency_ms": response.latency_ms, "tokens": response.usage.completion_tokens});
        Ok((response.text, Some(sources), false, metadata))
    }

    fn failure(&self, request_id: &str, error: TurnError) -> TurnFailure {
        TurnFailure { error, request_id: request_id.to_string() }
    }

    async fn emit(&self, request_id: &str, component: &str, event_type: &str, severity: Severity, duration_ms: Option<u64>, metadata: serde_json::Value) {
        let mut event = ObservabilityEvent::new(request_id, component, event_type, severity).with_metadata(metadata);
        if let Some(ms) = duration_ms {
            event = event.with_duration(ms);
        }
        if let Err(err) = self.events.record(event).await {
            tracing::error!(error = %err, "failed to record observability event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use lendcore_eligibility::catalog::ChecksCatalog;
    use lendcore_eligibility::dataset::EligibilityDataset;
    use lendcore_eligibility::playbook::ReasonPlaybook;
    use lendcore_eligibility::rules::ReasonDetectionRules;

    struct EchoGenerationProvider;

    #[async_trait]
    impl GenerationProvider for EchoGenerationProvider {
        fn provider_id(&self) -> &str {
            "echo"
        }
        async fn generate(
            &self,
            prompt: &str,
            _system_instruction: &str,
            _config: &GenerationConfig,
        ) -> lendcore_llm::Result<lendcore_llm::GenerationResponse> {
            Ok(lendcore_llm::GenerationResponse {
                text: format!("echo: {prompt}"),
                usage: lendcore_llm::Usage::default(),
                latency_ms: 1,
                metadata: serde_json::json!({}),
            })
        }
    }

    struct FixedEmbeddingProvider;

    #[async_trait]
    impl EmbeddingProvider for FixedEmbeddingProvider {
        fn provider_id(&self) -> &str {
            "ollama"
        }
        fn model(&self) -> &str {
            "nomic-embed-text"
        }
        fn dimensionality(&self) -> usize {
            768
        }
        async fn embed_query(&self, _text: &str) -> lendcore_llm::Result<Vec<f32>> {
            Ok(vec![1.0; 768])
        }
        async fn embed_documents(&self, _texts: &[String]) -> lendcore_llm::Result<Vec<Vec<f32>>> {
            Ok(vec![vec![1.0; 768]])
        }
    }

    fn empty_eligibility_registry() -> Arc<EligibilityRegistry> {
        Arc::new(EligibilityRegistry::from_parts(
            ChecksCatalog { columns: vec![], numeric_null_fields: vec![] },
            ReasonDetectionRules { rules: vec![], ignore: vec![] },
            ReasonPlaybook::default(),
            EligibilityDataset::from_rows(vec![], vec![]).unwrap(),
        ))
    }

    fn build_router(dir: &std::path::Path) -> Router {
        let memory_config = lendcore_config::MemoryConfig {
            event_log_path: dir.join("messages.jsonl").to_string_lossy().to_string(),
            index_path: dir.join("conversations.redb").to_string_lossy().to_string(),
            ..Default::default()
        };
        let mut retrieval_config = RetrievalConfig::default();
        retrieval_config.persistence_root = dir.join("vectors").to_string_lossy().to_string();

        let conversations = Arc::new(ConversationManager::open(memory_config.clone()).unwrap());
        let embedding_registry = Arc::new(lendcore_retrieval::EmbeddingSpaceRegistry::from_config(
            &lendcore_config::ProviderConfig::default(),
            &retrieval_config,
        ));
        let events = EventSink::new(dir.join("events.jsonl"));

        Router::new(
            empty_eligibility_registry(),
            conversations,
            embedding_registry,
            Arc::new(FixedEmbeddingProvider),
            Arc::new(EchoGenerationProvider),
            retrieval_config,
            memory_config,
            events,
        )
    }

    #[tokio::test]
    async fn eligibility_query_without_account_prompts_for_one() {
        let dir = tempfile::tempdir().unwrap();
        let router = build_router(dir.path());
        let conversation_id = Uuid::new_v4();

        let response = router.turn("user-1", conversation_id, "am I eligible?", "req-1").await.unwrap();
        assert!(response.is_eligibility_flow);
        assert!(response.response.contains("10-digit"));
    }

    #[tokio::test]
    async fn rag_query_calls_generation_provider_with_composed_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let router = build_router(dir.path());
        let conversation_id = Uuid::new_v4();

        let response = router.turn("user-1", conversation_id, "what documents do I need?", "req-1").await.unwrap();
        assert!(!response.is_eligibility_flow);
        assert!(response.response.starts_with("echo:"));
        assert!(response.response.contains("QUESTION: what documents do I need?"));
    }

    #[tokio::test]
    async fn eligibility_query_with_unknown_account_cannot_confirm() {
        let dir = tempfile::tempdir().unwrap();
        let router = build_router(dir.path());
        let conversation_id = Uuid::new_v4();

        let response = router.turn("user-1", conversation_id, "is 1234567890 eligible?", "req-1").await.unwrap();
        assert!(response.is_eligibility_flow);
        assert!(response.response.contains("CANNOT_CONFIRM"));
    }
}
