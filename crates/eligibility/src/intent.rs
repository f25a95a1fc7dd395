use sha2::{Digest, Sha256};

/// Compiled, case-insensitive keyword/phrase set describing eligibility
/// concerns. A plain substring scan is sufficient and avoids pulling in a
/// regex dependency for this kind of classification.
const ELIGIBILITY_PHRASES: &[&str] = &[
    "eligible",
    "eligibility",
    "not eligible",
    "ineligible",
    "limit",
    "limit issue",
    "loan limit",
    "loan limit issue",
    "getting a limit",
    "why excluded",
    "why was i excluded",
    "why am i excluded",
    "credit limit",
    "cannot confirm",
    "disqualified",
    "exclusion reason",
];

/// Intent detection result: whether the message is an eligibility query,
/// and the SHA-256 hash of the raw text for PII-safe logging.
pub struct IntentDetection {
    pub is_eligibility_query: bool,
    pub message_hash: String,
}

pub fn hash_text(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn detect(text: &str) -> IntentDetection {
    let lowered = text.to_lowercase();
    let is_eligibility_query = ELIGIBILITY_PHRASES.iter().any(|phrase| lowered.contains(phrase));
    IntentDetection {
        is_eligibility_query,
        message_hash: hash_text(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eligibility_keywords_are_detected_case_insensitively() {
        assert!(detect("Is account 1234567890 ELIGIBLE?").is_eligibility_query);
        assert!(detect("why is 9999999999 not getting a limit?").is_eligibility_query);
    }

    #[test]
    fn bare_limit_wording_is_detected() {
        assert!(detect("what's my limit on account 1234567890?").is_eligibility_query);
        assert!(detect("why was I excluded from a limit increase?").is_eligibility_query);
        assert!(detect("1234567890 isn't getting a limit, why not?").is_eligibility_query);
    }

    #[test]
    fn unrelated_message_falls_through() {
        assert!(!detect("What documents do I need for digital lending?").is_eligibility_query);
    }

    #[test]
    fn hash_is_deterministic_and_stable_length() {
        let a = hash_text("1234567890");
        let b = hash_text("1234567890");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }
}
