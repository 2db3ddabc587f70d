//! Run lifecycle: builds the three phases for an input, drives them through
//! the run state machine and reports the outcome.

mod report;
mod runner;
mod state;

pub use report::{RunOutcome, RunReport};
pub use runner::Orchestrator;
pub use state::{RunState, StateEntry, StateTracker};
