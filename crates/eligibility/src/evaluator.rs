use tracing::error;

use crate::dataset::Row;
use crate::intent::hash_text;
use crate::registry::EligibilityRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Eligible,
    NotEligible,
    CannotConfirm,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Reason {
    pub code: String,
    pub meaning: Option<String>,
    pub facts: Vec<String>,
    pub evidence: std::collections::HashMap<String, String>,
    pub next_steps: Vec<crate::playbook::NextStep>,
    pub review_type: Option<String>,
    pub review_timing: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AccountResult {
    pub account_number_hash: String,
    pub customer_name_hash: Option<String>,
    pub status: Status,
    pub reasons: Vec<Reason>,
}

/// Classify and, when applicable, extract+enrich exclusion reasons for one
/// account. The raw account number never leaves this function — every
/// caller (including the generation prompt) only ever sees its hash.
pub fn evaluate_account(registry: &EligibilityRegistry, account: &str) -> AccountResult {
    let account_number_hash = hash_text(account);

    if registry.dataset().is_eligible(account) {
        return AccountResult {
            account_number_hash,
            customer_name_hash: None,
            status: Status::Eligible,
            reasons: Vec::new(),
        };
    }

    let Some(raw_row) = registry.dataset().reason_row(account) else {
        return AccountResult {
            account_number_hash,
            customer_name_hash: None,
            status: Status::CannotConfirm,
            reasons: Vec::new(),
        };
    };

    let row = normalize_row(registry, raw_row);
    let reasons = extract_reasons(registry, &row);

    AccountResult {
        account_number_hash,
        customer_name_hash: None,
        status: Status::NotEligible,
        reasons,
    }
}

pub fn evaluate_batch(registry: &EligibilityRegistry, accounts: &[String]) -> Vec<AccountResult> {
    accounts.iter().map(|account| evaluate_account(registry, account)).collect()
}

fn normalize_row(registry: &EligibilityRegistry, raw_row: &Row) -> Row {
    let catalog = registry.catalog();
    let mut normalized = Row::new();
    for col in &catalog.columns {
        let raw_value = raw_row.get(&col.name).map(String::as_str);
        normalized.insert(col.name.clone(), catalog.normalize(&col.name, raw_value));
    }
    // Preserve any columns present in the row but absent from the catalog
    // (forward-compatible data sources) without normalizing them.
    for (key, value) in raw_row {
        normalized.entry(key.clone()).or_insert_with(|| value.clone());
    }
    normalized
}

/// Global policy: extract every check column whose value equals `Exclude`
/// plus `Recency_Check = N`, always multi-reason, respecting the ignore set.
fn extract_reasons(registry: &EligibilityRegistry, row: &Row) -> Vec<Reason> {
    let rules = registry.rules();
    let playbook = registry.playbook();

    rules
        .active_rules()
        .filter(|rule| rule.trigger.fires(row))
        .map(|rule| {
            let evidence = rule
                .evidence_columns
                .iter()
                .map(|col| (col.clone(), row.get(col).cloned().unwrap_or_default()))
                .collect();
            let facts = rule.facts_builder.build(row);

            match playbook.get(&rule.reason_code) {
                Some(entry) => Reason {
                    code: rule.reason_code.clone(),
                    meaning: Some(entry.meaning.clone()),
                    facts,
                    evidence,
                    next_steps: entry.next_steps.clone(),
                    review_type: Some(entry.review_type.clone()),
                    review_timing: Some(entry.review_timing.clone()),
                },
                None => {
                    error!(reason_code = %rule.reason_code, "reason code has no playbook entry; emitting raw facts only");
                    Reason {
                        code: rule.reason_code.clone(),
                        meaning: None,
                        facts,
                        evidence,
                        next_steps: Vec::new(),
                        review_type: None,
                        review_timing: None,
                    }
                }
            }
        })
        .collect()
}
