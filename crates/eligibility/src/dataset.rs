use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{EligibilityError, Result};

pub type Row = HashMap<String, String>;

/// Raw row shape as loaded from the reasons-file data source before it is
/// normalized against the [`crate::catalog::ChecksCatalog`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawReasonRow {
    pub account_number: String,
    #[serde(flatten)]
    pub fields: Row,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEligibleRow {
    pub account_number: String,
}

/// Two indexed tables keyed by 10-digit account number.
///
/// Invariant: `eligible` and `reasons` are disjoint — the loader enforces
/// this at construction time.
#[derive(Debug, Clone, Default)]
pub struct EligibilityDataset {
    eligible: HashSet<String>,
    reasons: HashMap<String, Row>,
}

impl EligibilityDataset {
    pub fn from_rows(eligible_rows: Vec<RawEligibleRow>, reason_rows: Vec<RawReasonRow>) -> Result<Self> {
        let eligible: HashSet<String> = eligible_rows.into_iter().map(|r| r.account_number).collect();
        let mut reasons = HashMap::new();
        for row in reason_rows {
            reasons.insert(row.account_number, row.fields);
        }

        let overlap: Vec<&String> = eligible.iter().filter(|acct| reasons.contains_key(*acct)).collect();
        if !overlap.is_empty() {
            return Err(EligibilityError::DataSchema(format!(
                "{} account(s) appear in both the eligible and reasons tables",
                overlap.len()
            )));
        }

        Ok(Self { eligible, reasons })
    }

    pub fn is_eligible(&self, account: &str) -> bool {
        self.eligible.contains(account)
    }

    pub fn reason_row(&self, account: &str) -> Option<&Row> {
        self.reasons.get(account)
    }

    pub fn is_empty_eligible(&self) -> bool {
        self.eligible.is_empty()
    }

    pub fn is_empty_reasons(&self) -> bool {
        self.reasons.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disjoint_lists_load_successfully() {
        let eligible = vec![RawEligibleRow { account_number: "1234567890".into() }];
        let reasons = vec![RawReasonRow {
            account_number: "9999999999".into(),
            fields: Row::new(),
        }];
        let dataset = EligibilityDataset::from_rows(eligible, reasons).unwrap();
        assert!(dataset.is_eligible("1234567890"));
        assert!(dataset.reason_row("9999999999").is_some());
    }

    #[test]
    fn overlapping_lists_are_rejected() {
        let eligible = vec![RawEligibleRow { account_number: "1234567890".into() }];
        let reasons = vec![RawReasonRow {
            account_number: "1234567890".into(),
            fields: Row::new(),
        }];
        assert!(EligibilityDataset::from_rows(eligible, reasons).is_err());
    }

    #[test]
    fn unknown_account_is_neither_eligible_nor_has_a_reason_row() {
        let dataset = EligibilityDataset::from_rows(vec![], vec![]).unwrap();
        assert!(!dataset.is_eligible("1111111111"));
        assert!(dataset.reason_row("1111111111").is_none());
    }
}
