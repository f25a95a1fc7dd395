use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A trigger condition evaluated against a normalized row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Trigger {
    CheckEquals { column: String, value: String },
    CheckSpecialEquals { column: String, value: String },
}

impl Trigger {
    pub fn column(&self) -> &str {
        match self {
            Trigger::CheckEquals { column, .. } => column,
            Trigger::CheckSpecialEquals { column, .. } => column,
        }
    }

    pub fn fires(&self, row: &HashMap<String, String>) -> bool {
        match self {
            Trigger::CheckEquals { column, value } => {
                row.get(column).map(|v| v == value).unwrap_or(false)
            }
            Trigger::CheckSpecialEquals { column, value } => {
                row.get(column).map(|v| v == value).unwrap_or(false)
            }
        }
    }
}

/// How to build the human-readable `facts[]` for a triggered reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FactsBuilder {
    Simple { facts: Vec<String> },
    SimpleWithParameters {
        /// Template strings containing `{column_name}` placeholders,
        /// resolved from the row and `parameters`.
        templates: Vec<String>,
        #[serde(default)]
        parameters: HashMap<String, String>,
    },
    MaxOfNumericFields {
        fields: Vec<String>,
        threshold: f64,
        /// Template for the resulting fact; supports `{max_value}`,
        /// `{max_field}`, and `{threshold}` placeholders.
        #[serde(default = "default_max_template")]
        template: String,
    },
}

fn default_max_template() -> String {
    "{max_field} reached {max_value} days, exceeding the {threshold}-day threshold".to_string()
}

fn substitute(template: &str, values: &HashMap<String, String>) -> String {
    let mut out = template.to_string();
    for (key, value) in values {
        out = out.replace(&format!("{{{key}}}"), value);
    }
    out
}

impl FactsBuilder {
    pub fn build(&self, row: &HashMap<String, String>) -> Vec<String> {
        match self {
            FactsBuilder::Simple { facts } => facts.clone(),
            FactsBuilder::SimpleWithParameters { templates, parameters } => {
                let mut values = row.clone();
                for (k, v) in parameters {
                    values.insert(k.clone(), v.clone());
                }
                templates.iter().map(|t| substitute(t, &values)).collect()
            }
            FactsBuilder::MaxOfNumericFields { fields, threshold, template } => {
                let mut best_field = String::new();
                let mut best_value = f64::NEG_INFINITY;
                for field in fields {
                    let parsed = row
                        .get(field)
                        .and_then(|v| v.parse::<f64>().ok())
                        .unwrap_or(0.0);
                    if parsed > best_value {
                        best_value = parsed;
                        best_field = field.clone();
                    }
                }
                if best_value == f64::NEG_INFINITY {
                    best_value = 0.0;
                }
                let mut values = HashMap::new();
                values.insert("max_field".to_string(), best_field);
                values.insert("max_value".to_string(), format_number(best_value));
                values.insert("threshold".to_string(), format_number(*threshold));
                vec![substitute(template, &values)]
            }
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasonRule {
    pub reason_code: String,
    pub trigger: Trigger,
    #[serde(default)]
    pub evidence_columns: Vec<String>,
    pub facts_builder: FactsBuilder,
}

/// Ordered list of reason definitions plus the global ignore set.
///
/// Ordering is load-bearing: the evaluator emits reasons in this document's
/// declared order, and tests depend on that determinism.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasonDetectionRules {
    pub rules: Vec<ReasonRule>,
    /// Columns that must never trigger regardless of value (e.g.
    /// `Normalized_Mean`).
    #[serde(default)]
    pub ignore: Vec<String>,
}

impl ReasonDetectionRules {
    pub fn is_ignored(&self, column: &str) -> bool {
        self.ignore.iter().any(|c| c == column)
    }

    /// Rules in declared order, skipping any whose trigger column is in the
    /// ignore set (defensive — a well-formed document never puts an ignored
    /// column behind a trigger, but the invariant is enforced here too).
    pub fn active_rules(&self) -> impl Iterator<Item = &ReasonRule> {
        self.rules.iter().filter(|r| !self.is_ignored(r.trigger.column()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_equals_fires_only_on_exact_match() {
        let trigger = Trigger::CheckEquals { column: "Joint_Check".into(), value: "Exclude".into() };
        let mut row = HashMap::new();
        row.insert("Joint_Check".to_string(), "Exclude".to_string());
        assert!(trigger.fires(&row));
        row.insert("Joint_Check".to_string(), "Include".to_string());
        assert!(!trigger.fires(&row));
    }

    #[test]
    fn max_of_numeric_fields_picks_the_largest_value() {
        let builder = FactsBuilder::MaxOfNumericFields {
            fields: vec!["Arrears_Days".into(), "Credit_Card_OD_Days".into(), "DPD_Days".into()],
            threshold: 5.0,
            template: default_max_template(),
        };
        let mut row = HashMap::new();
        row.insert("Arrears_Days".to_string(), "10".to_string());
        row.insert("Credit_Card_OD_Days".to_string(), "4".to_string());
        row.insert("DPD_Days".to_string(), "2".to_string());
        let facts = builder.build(&row);
        assert_eq!(facts.len(), 1);
        assert!(facts[0].contains("Arrears_Days"));
        assert!(facts[0].contains("10"));
    }

    #[test]
    fn simple_with_parameters_substitutes_columns_and_statics() {
        let builder = FactsBuilder::SimpleWithParameters {
            templates: vec!["limit of {limit_amount} applies to account segment {segment}".into()],
            parameters: HashMap::from([("limit_amount".to_string(), "50000".to_string())]),
        };
        let mut row = HashMap::new();
        row.insert("segment".to_string(), "retail".to_string());
        let facts = builder.build(&row);
        assert_eq!(facts[0], "limit of 50000 applies to account segment retail");
    }

    #[test]
    fn ignored_column_never_triggers() {
        let rules = ReasonDetectionRules {
            rules: vec![ReasonRule {
                reason_code: "BOGUS".into(),
                trigger: Trigger::CheckEquals { column: "Normalized_Mean".into(), value: "Exclude".into() },
                evidence_columns: vec![],
                facts_builder: FactsBuilder::Simple { facts: vec!["n/a".into()] },
            }],
            ignore: vec!["Normalized_Mean".into()],
        };
        assert_eq!(rules.active_rules().count(), 0);
    }
}
