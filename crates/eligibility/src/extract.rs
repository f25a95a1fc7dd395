/// Find all disjoint runs of exactly ten ASCII digits, word-bounded (not
/// immediately preceded or followed by another digit or letter), deduping
/// while preserving first-seen order.
pub fn extract_accounts(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut found = Vec::new();
    let mut seen = std::collections::HashSet::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i].is_ascii_digit() {
            let start = i;
            let mut end = i;
            while end < chars.len() && chars[end].is_ascii_digit() {
                end += 1;
            }
            let run_len = end - start;
            let left_ok = start == 0 || !chars[start - 1].is_ascii_alphanumeric();
            let right_ok = end == chars.len() || !chars[end].is_ascii_alphanumeric();
            if run_len == 10 && left_ok && right_ok {
                let candidate: String = chars[start..end].iter().collect();
                if seen.insert(candidate.clone()) {
                    found.push(candidate);
                }
            }
            i = end;
        } else {
            i += 1;
        }
    }
    found
}

/// Partition candidates into `(valid, invalid)`. Valid iff the string is
/// exactly ten ASCII digits — a no-op check for output of
/// [`extract_accounts`], but `validate` is also the entry point for
/// operator-supplied account numbers (e.g. pasted directly, no digit run
/// extraction involved).
pub fn validate(candidates: Vec<String>) -> (Vec<String>, Vec<String>) {
    let mut valid = Vec::new();
    let mut invalid = Vec::new();
    for candidate in candidates {
        if candidate.len() == 10 && candidate.chars().all(|c| c.is_ascii_digit()) {
            valid.push(candidate);
        } else {
            invalid.push(candidate);
        }
    }
    (valid, invalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_single_account() {
        let found = extract_accounts("Is account 1234567890 eligible?");
        assert_eq!(found, vec!["1234567890".to_string()]);
    }

    #[test]
    fn dedupes_preserving_first_seen_order() {
        let found = extract_accounts("check 1234567890 again, 1234567890 please, also 9999999999");
        assert_eq!(found, vec!["1234567890".to_string(), "9999999999".to_string()]);
    }

    #[test]
    fn longer_digit_runs_are_not_matched() {
        let found = extract_accounts("reference number 123456789012 is not an account");
        assert!(found.is_empty());
    }

    #[test]
    fn digits_adjacent_to_letters_are_not_matched() {
        let found = extract_accounts("ticket ABC1234567890 should not match");
        assert!(found.is_empty());
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(extract_accounts("").is_empty());
        let (valid, invalid) = validate(vec![]);
        assert!(valid.is_empty() && invalid.is_empty());
    }

    #[test]
    fn validate_partitions_valid_and_invalid() {
        let (valid, invalid) = validate(vec!["1234567890".to_string(), "12345".to_string()]);
        assert_eq!(valid, vec!["1234567890".to_string()]);
        assert_eq!(invalid, vec!["12345".to_string()]);
    }
}
