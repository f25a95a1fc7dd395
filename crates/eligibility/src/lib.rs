pub mod catalog;
pub mod dataset;
pub mod error;
pub mod evaluator;
pub mod extract;
pub mod intent;
pub mod playbook;
pub mod registry;
pub mod rules;

pub mod payload;

pub use error::{EligibilityError, Result};
pub use evaluator::{evaluate_account, evaluate_batch, AccountResult, Reason, Status};
pub use payload::{assemble, EligibilityPayload, EligibilitySummary};
pub use registry::{EligibilityRegistry, RegistryPaths};
