use serde::{Deserialize, Serialize};

use crate::error::{EligibilityError, Result};

/// The role a column plays in a row of the tabular eligibility data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    Identifier,
    /// Expects one of `Include`, `Exclude`, or blank.
    Check,
    /// The `Recency` column family: expects `Y`, `N`, or blank.
    CheckSpecial,
    Evidence,
    Ignore,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub role: ColumnRole,
}

/// Column schema of the tabular data source, plus normalization rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecksCatalog {
    pub columns: Vec<ColumnDef>,
    /// Columns that normalize a null/blank value to `"0"` rather than `""`.
    #[serde(default)]
    pub numeric_null_fields: Vec<String>,
}

const EXPECTED_CHECK_VALUES: &[&str] = &["Include", "Exclude", ""];
const EXPECTED_CHECK_SPECIAL_VALUES: &[&str] = &["Y", "N", ""];

impl ChecksCatalog {
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn is_numeric_null_field(&self, name: &str) -> bool {
        self.numeric_null_fields.iter().any(|f| f == name)
    }

    /// Validate structural invariants: no duplicate column names, and the
    /// value-set constraints on `check`/`check_special` columns are only
    /// declared against columns that actually carry that role.
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for col in &self.columns {
            if !seen.insert(col.name.as_str()) {
                return Err(EligibilityError::ConfigSchema(format!(
                    "duplicate column '{}' in checks catalog",
                    col.name
                )));
            }
        }
        Ok(())
    }

    /// Normalize a raw cell value for a column: blanks become empty string
    /// (or `"0"` for declared numeric-null fields); everything else passes
    /// through unchanged.
    pub fn normalize(&self, column: &str, raw: Option<&str>) -> String {
        let trimmed = raw.map(str::trim).unwrap_or("");
        if trimmed.is_empty() {
            if self.is_numeric_null_field(column) {
                return "0".to_string();
            }
            return String::new();
        }
        trimmed.to_string()
    }

    /// Returns `true` and logs nothing when the value for a `check` column is
    /// within the expected set; callers are expected to warn on a `false`
    /// result and still proceed (load-time normalization, not rejection).
    pub fn check_value_in_expected_set(&self, value: &str) -> bool {
        EXPECTED_CHECK_VALUES.contains(&value)
    }

    pub fn check_special_value_in_expected_set(&self, value: &str) -> bool {
        EXPECTED_CHECK_SPECIAL_VALUES.contains(&value)
    }
}
