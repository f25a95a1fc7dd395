use thiserror::Error;

/// Startup-fatal and data-availability error kinds.
///
/// Any of the startup-fatal variants returned while loading the config/data
/// registry must prevent the router from servicing eligibility requests —
/// the caller is expected to treat `Err` from [`crate::registry::EligibilityRegistry::load`]
/// as fatal to process boot.
#[derive(Debug, Error)]
pub enum EligibilityError {
    #[error("config file missing: {0}")]
    ConfigMissing(String),
    #[error("config parse error in {path}: {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("config schema error: {0}")]
    ConfigSchema(String),
    #[error("data file missing: {0}")]
    DataMissing(String),
    #[error("data schema error: {0}")]
    DataSchema(String),
    #[error("reason code '{0}' has no playbook entry")]
    UnresolvedReasonCode(String),
    /// Distinct from `DataMissing`: the file loaded but the table has zero
    /// rows. Not fatal — the router surfaces a user-friendly message and a
    /// reload signal is emitted for an out-of-scope subsystem to act on.
    #[error("data source '{0}' is present but empty")]
    DataUnavailable(String),
}

pub type Result<T> = std::result::Result<T, EligibilityError>;
