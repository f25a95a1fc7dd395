use sha2::{Digest, Sha256};

/// Hash raw text for PII-safe logging. Never log `text` itself — only this
/// hash and, where relevant, a count.
pub fn hash_text(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_input_hashes_identically() {
        assert_eq!(hash_text("account 1234567890"), hash_text("account 1234567890"));
    }

    #[test]
    fn different_input_hashes_differently() {
        assert_ne!(hash_text("a"), hash_text("b"));
    }

    #[test]
    fn hash_never_contains_raw_text() {
        let hash = hash_text("sensitive-account-number");
        assert!(!hash.contains("sensitive"));
    }
}
