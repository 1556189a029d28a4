pub mod driver;
pub mod state;

pub use driver::{Orchestrator, RunOutcome, RunSummary};
pub use state::{DriverState, FailureReason};
