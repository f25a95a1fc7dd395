use lendcore_retrieval::VectorChunk;

use crate::versions::resolve;

/// One turn of already-fetched conversation history, oldest-first.
#[derive(Debug, Clone)]
pub struct HistoryTurn {
    pub role: String,
    pub content: String,
}

/// All pre-computed data needed to assemble the RAG-path prompt. Callers do
/// the async work (fetching summary/history/chunks) beforehand; composing
/// the final messages is purely synchronous.
pub struct PromptInputs<'a> {
    pub prompt_version: &'a str,
    pub summary: Option<&'a str>,
    pub history: &'a [HistoryTurn],
    /// Chunks in best-first order (lowest distance score first); truncation
    /// drops from the tail once the char budget is exhausted.
    pub chunks: &'a [(VectorChunk, f32)],
    pub user_query: &'a str,
    pub chunk_char_budget: usize,
}

#[derive(Debug, Clone)]
pub struct ComposedPrompt {
    pub system_instruction: String,
    pub user_prompt: String,
}

/// Build the `{system_instruction, user_prompt}` pair handed to a
/// [`lendcore_llm::GenerationProvider`].
pub fn build(inputs: &PromptInputs<'_>) -> ComposedPrompt {
    let system_instruction = resolve(inputs.prompt_version).to_string();

    let summary_block = inputs.summary.unwrap_or("");
    let history_block = format_history(inputs.history);
    let documents_block = format_documents(inputs.chunks, inputs.chunk_char_budget);

    let user_prompt = format!(
        "PAST CONTEXT (summary):\n{summary_block}\n\n\
         RECENT CONVERSATION:\n{history_block}\n\n\
         DOCUMENTS:\n{documents_block}\n\n\
         QUESTION: {question}",
        question = inputs.user_query,
    );

    ComposedPrompt { system_instruction, user_prompt }
}

fn format_history(history: &[HistoryTurn]) -> String {
    history.iter().map(|turn| format!("{}: {}", turn.role, turn.content)).collect::<Vec<_>>().join("\n")
}

/// Join chunk content with `\n---\n`, truncating from the tail (lowest
/// ranked first) once the cumulative char budget is exceeded.
fn format_documents(chunks: &[(VectorChunk, f32)], char_budget: usize) -> String {
    let mut kept = Vec::new();
    let mut used = 0usize;
    for (chunk, _score) in chunks {
        let remaining = char_budget.saturating_sub(used);
        if remaining == 0 {
            break;
        }
        let content = if chunk.content.len() > remaining {
            chunk.content.chars().take(remaining).collect::<String>()
        } else {
            chunk.content.clone()
        };
        used += content.len();
        kept.push(content);
    }
    kept.join("\n---\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(content: &str) -> (VectorChunk, f32) {
        (
            VectorChunk {
                chunk_id: "c".to_string(),
                source_doc: "doc".to_string(),
                page: None,
                content: content.to_string(),
                embedding_space_tag: "ollama:nomic-embed-text:dim=768".to_string(),
            },
            0.1,
        )
    }

    #[test]
    fn build_includes_all_sections() {
        let chunks = vec![chunk("required documents list")];
        let history = vec![HistoryTurn { role: "user".to_string(), content: "hi".to_string() }];
        let inputs = PromptInputs {
            prompt_version: "v1",
            summary: Some("user previously asked about KYC"),
            history: &history,
            chunks: &chunks,
            user_query: "What documents do I need?",
            chunk_char_budget: 6000,
        };
        let composed = build(&inputs);
        assert!(composed.user_prompt.contains("PAST CONTEXT"));
        assert!(composed.user_prompt.contains("user previously asked about KYC"));
        assert!(composed.user_prompt.contains("RECENT CONVERSATION"));
        assert!(composed.user_prompt.contains("user: hi"));
        assert!(composed.user_prompt.contains("DOCUMENTS"));
        assert!(composed.user_prompt.contains("required documents list"));
        assert!(composed.user_prompt.contains("QUESTION: What documents do I need?"));
    }

    #[test]
    fn missing_summary_renders_empty_block() {
        let inputs = PromptInputs {
            prompt_version: "v1",
            summary: None,
            history: &[],
            chunks: &[],
            user_query: "hello",
            chunk_char_budget: 6000,
        };
        let composed = build(&inputs);
        assert!(composed.user_prompt.contains("PAST CONTEXT (summary):\n\n"));
    }

    #[test]
    fn chunk_truncation_preserves_highest_scored_chunks_first() {
        let chunks = vec![chunk("AAAAA"), chunk("BBBBB")];
        let inputs = PromptInputs {
            prompt_version: "v1",
            summary: None,
            history: &[],
            chunks: &chunks,
            user_query: "q",
            chunk_char_budget: 5,
        };
        let composed = build(&inputs);
        assert!(composed.user_prompt.contains("AAAAA"));
        assert!(!composed.user_prompt.contains("BBBBB"));
    }
}
