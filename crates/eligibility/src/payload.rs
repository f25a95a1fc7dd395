use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::evaluator::{evaluate_batch, AccountResult, Status};
use crate::registry::EligibilityRegistry;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EligibilitySummary {
    pub total_accounts: usize,
    pub eligible_count: usize,
    pub not_eligible_count: usize,
    pub cannot_confirm_count: usize,
    pub total_reasons: usize,
    pub processing_latency_ms: u64,
}

/// Full response for one eligibility turn — bit-exact wire contract the
/// generator and the test harness both consume. Every account is carried by
/// its hash only; the raw account number never appears here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EligibilityPayload {
    pub request_id: String,
    pub batch_timestamp: DateTime<Utc>,
    pub accounts: Vec<AccountResult>,
    pub summary: EligibilitySummary,
}

/// Evaluate `valid_accounts` and assemble the full payload, given the
/// `invalid_accounts` already filtered out upstream by [`crate::extract::validate`].
///
/// `started_at` must be an [`std::time::Instant`] captured before extraction
/// began, so `processing_latency_ms` covers the whole eligibility turn, not
/// just evaluation.
pub fn assemble(
    registry: &EligibilityRegistry,
    request_id: &str,
    valid_accounts: &[String],
    invalid_accounts: &[String],
    started_at: std::time::Instant,
) -> EligibilityPayload {
    let accounts = evaluate_batch(registry, valid_accounts);

    let mut summary = EligibilitySummary {
        total_accounts: valid_accounts.len() + invalid_accounts.len(),
        ..Default::default()
    };
    for account in &accounts {
        match account.status {
            Status::Eligible => summary.eligible_count += 1,
            Status::NotEligible => summary.not_eligible_count += 1,
            Status::CannotConfirm => summary.cannot_confirm_count += 1,
        }
        summary.total_reasons += account.reasons.len();
    }
    summary.processing_latency_ms = started_at.elapsed().as_millis() as u64;

    EligibilityPayload {
        request_id: request_id.to_string(),
        batch_timestamp: Utc::now(),
        accounts,
        summary,
    }
}
