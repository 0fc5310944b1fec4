//! Shared utilities.

pub mod clock;
pub mod telemetry;

pub use clock::{deadline_after, remaining};
pub use telemetry::init_tracing;
