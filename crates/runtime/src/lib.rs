pub mod error;
pub mod router;

pub use error::{ErrorKind, TurnError};
pub use router::{Router, TurnFailure, TurnOutcome, TurnResponse};
