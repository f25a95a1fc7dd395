pub mod events;
pub mod pii;
pub mod sink;

pub use events::{ObservabilityEvent, Severity};
pub use pii::hash_text;
pub use sink::EventSink;
