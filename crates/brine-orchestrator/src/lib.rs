//! Brine Orchestrator
//!
//! Runs an [`OrderedPlan`](brine_workflow::OrderedPlan) stage by stage.
//!
//! Sequential stages run their members one after another, each seeing the
//! outputs of the ones before it. Parallel stages fan out over a bounded
//! worker set against one context snapshot and merge at the stage barrier.
//! Every unit output is published on the bus, evaluated, and recorded before
//! any later stage starts.
//!
//! The scheduler owns all run state in an explicit [`RunState`], returned to
//! the caller whether the run completes or fails.

mod context;
mod error;
mod events;
mod scheduler;
mod state;
mod status;
mod task;

pub use context::RunContext;
pub use error::{RunError, RunFailure};
pub use events::ExecutionEvent;
pub use scheduler::{SchedulerConfig, WorkflowScheduler};
pub use state::RunState;
pub use status::{RunStatus, WorkflowStatus};
