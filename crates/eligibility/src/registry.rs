use std::fs;
use std::path::Path;

use tracing::warn;

use crate::catalog::ChecksCatalog;
use crate::dataset::{EligibilityDataset, RawEligibleRow, RawReasonRow};
use crate::error::{EligibilityError, Result};
use crate::playbook::ReasonPlaybook;
use crate::rules::ReasonDetectionRules;

/// Paths to the five files the registry loads at startup.
pub struct RegistryPaths<'a> {
    pub checks_catalog: &'a Path,
    pub reason_rules: &'a Path,
    pub reason_playbook: &'a Path,
    pub eligible_customers: &'a Path,
    pub reasons_file: &'a Path,
}

/// Process-lifetime, read-only config and data registry.
///
/// Construction is the only place validation happens — once built, every
/// lookup is infallible and `&self`-only; there is no lock because nothing
/// ever mutates it again.
pub struct EligibilityRegistry {
    catalog: ChecksCatalog,
    rules: ReasonDetectionRules,
    playbook: ReasonPlaybook,
    dataset: EligibilityDataset,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path)
        .map_err(|_| EligibilityError::ConfigMissing(path.display().to_string()))?;
    serde_json::from_str(&raw).map_err(|source| EligibilityError::ConfigParse {
        path: path.display().to_string(),
        source,
    })
}

fn read_json_data<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path)
        .map_err(|_| EligibilityError::DataMissing(path.display().to_string()))?;
    serde_json::from_str(&raw).map_err(|err| EligibilityError::DataSchema(err.to_string()))
}

impl EligibilityRegistry {
    /// Load and validate all five documents. Any of `file-missing`,
    /// `parse-error`, `schema-mismatch`, `unresolved-reason-code` is
    /// returned as `Err` — the caller must treat that as fatal to boot.
    pub fn load(paths: RegistryPaths<'_>) -> Result<Self> {
        let catalog: ChecksCatalog = read_json(paths.checks_catalog)?;
        catalog.validate()?;

        let rules: ReasonDetectionRules = read_json(paths.reason_rules)?;
        let playbook: ReasonPlaybook = read_json(paths.reason_playbook)?;

        Self::validate_rules_against_catalog(&catalog, &rules)?;
        Self::validate_reason_codes_resolved(&rules, &playbook)?;

        let eligible_rows: Vec<RawEligibleRow> = read_json_data(paths.eligible_customers)?;
        let reason_rows: Vec<RawReasonRow> = read_json_data(paths.reasons_file)?;
        let dataset = EligibilityDataset::from_rows(eligible_rows, reason_rows)
            .map_err(|err| EligibilityError::DataSchema(err.to_string()))?;

        Ok(Self { catalog, rules, playbook, dataset })
    }

    fn validate_rules_against_catalog(catalog: &ChecksCatalog, rules: &ReasonDetectionRules) -> Result<()> {
        for rule in &rules.rules {
            let column = rule.trigger.column();
            if !catalog.has_column(column) {
                return Err(EligibilityError::ConfigSchema(format!(
                    "rule '{}' references unknown column '{column}'",
                    rule.reason_code
                )));
            }
            for evidence in &rule.evidence_columns {
                if !catalog.has_column(evidence) {
                    return Err(EligibilityError::ConfigSchema(format!(
                        "rule '{}' references unknown evidence column '{evidence}'",
                        rule.reason_code
                    )));
                }
            }
        }
        Ok(())
    }

    fn validate_reason_codes_resolved(rules: &ReasonDetectionRules, playbook: &ReasonPlaybook) -> Result<()> {
        for rule in &rules.rules {
            if !playbook.contains(&rule.reason_code) {
                return Err(EligibilityError::UnresolvedReasonCode(rule.reason_code.clone()));
            }
        }
        Ok(())
    }

    /// Assemble an already-validated registry directly, bypassing file I/O.
    /// Used by tests and by callers that source the four documents from
    /// something other than the filesystem.
    pub fn from_parts(
        catalog: ChecksCatalog,
        rules: ReasonDetectionRules,
        playbook: ReasonPlaybook,
        dataset: EligibilityDataset,
    ) -> Self {
        Self { catalog, rules, playbook, dataset }
    }

    pub fn catalog(&self) -> &ChecksCatalog {
        &self.catalog
    }

    pub fn rules(&self) -> &ReasonDetectionRules {
        &self.rules
    }

    pub fn playbook(&self) -> &ReasonPlaybook {
        &self.playbook
    }

    pub fn dataset(&self) -> &EligibilityDataset {
        &self.dataset
    }

    /// `DATA_UNAVAILABLE` check: both tables loaded but are empty, which is
    /// distinct from a missing file (that already failed `load`). The
    /// caller surfaces a "contact admin" message and emits a reload signal
    /// to the (out-of-scope) data-refresh subsystem.
    pub fn data_unavailable(&self) -> Option<EligibilityError> {
        if self.dataset.is_empty_eligible() && self.dataset.is_empty_reasons() {
            Some(EligibilityError::DataUnavailable("eligibility dataset".to_string()))
        } else {
            None
        }
    }

    pub fn check_value_warnings(&self, row: &crate::dataset::Row) -> Vec<String> {
        let mut warnings = Vec::new();
        for col in &self.catalog.columns {
            if col.role != crate::catalog::ColumnRole::Check {
                continue;
            }
            if let Some(value) = row.get(&col.name) {
                if !self.catalog.check_value_in_expected_set(value) {
                    let message = format!("column '{}' has unexpected value '{value}'", col.name);
                    warn!(column = %col.name, value = %value, "unexpected check-column value");
                    warnings.push(message);
                }
            }
        }
        warnings
    }
}
