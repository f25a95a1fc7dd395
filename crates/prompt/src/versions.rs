use std::collections::HashMap;

const V1_SYSTEM_PROMPT: &str = "You are a bank staff assistant answering questions about digital lending products and policies. Answer only from PAST CONTEXT, RECENT CONVERSATION, and DOCUMENTS. If the documents don't contain the answer, say so plainly rather than guessing.";

/// System prompt registry keyed by `prompt_version`. `"v1"` is the
/// default; unknown versions fall back to it rather than failing the turn.
pub fn system_prompts() -> HashMap<&'static str, &'static str> {
    let mut prompts = HashMap::new();
    prompts.insert("v1", V1_SYSTEM_PROMPT);
    prompts
}

pub fn resolve(prompt_version: &str) -> &'static str {
    system_prompts().get(prompt_version).copied().unwrap_or(V1_SYSTEM_PROMPT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_version_falls_back_to_v1() {
        assert_eq!(resolve("v1"), resolve("does-not-exist"));
    }
}
