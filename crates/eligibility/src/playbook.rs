use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NextStep {
    pub action: String,
    pub owner: String,
    #[serde(default)]
    pub timing: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybookEntry {
    pub meaning: String,
    pub next_steps: Vec<NextStep>,
    pub review_type: String,
    pub review_timing: String,
    #[serde(default)]
    pub manual_override_allowed: bool,
    #[serde(default)]
    pub constraints: Vec<String>,
}

/// The staff-facing explanation layer keyed by `reason_code`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReasonPlaybook {
    pub entries: HashMap<String, PlaybookEntry>,
}

impl ReasonPlaybook {
    pub fn get(&self, reason_code: &str) -> Option<&PlaybookEntry> {
        self.entries.get(reason_code)
    }

    pub fn contains(&self, reason_code: &str) -> bool {
        self.entries.contains_key(reason_code)
    }
}
