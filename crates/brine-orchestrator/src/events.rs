//! Execution events.
//!
//! Events are published on the bus `status` channel so the supervisor, a CLI
//! or a test can follow a run without touching scheduler state.

use brine_bus::{Channel, CommunicationBus, MessageKind};
use serde::{Deserialize, Serialize};

pub(crate) const SCHEDULER: &str = "scheduler";
pub(crate) const SUPERVISOR: &str = "supervisor";

/// Events emitted during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ExecutionEvent {
  RunStarted {
    run_id: String,
    workflow: String,
  },

  StageStarted {
    run_id: String,
    stage: String,
    parallel: bool,
  },

  UnitStarted {
    run_id: String,
    stage: String,
    unit: String,
    attempt: u32,
  },

  /// The unit timed out and will be attempted again after `delay_ms`.
  UnitRetrying {
    run_id: String,
    stage: String,
    unit: String,
    attempt: u32,
    delay_ms: u64,
  },

  UnitCompleted {
    run_id: String,
    stage: String,
    unit: String,
  },

  UnitFailed {
    run_id: String,
    stage: String,
    unit: String,
    error: String,
  },

  StageCompleted {
    run_id: String,
    stage: String,
  },

  RunCompleted {
    run_id: String,
  },

  RunFailed {
    run_id: String,
    stage: Option<String>,
    error: String,
  },
}

impl ExecutionEvent {
  pub(crate) fn publish(self, bus: &CommunicationBus) {
    // Serializing a plain enum of strings cannot fail.
    let content = serde_json::to_value(&self).unwrap_or(serde_json::Value::Null);
    bus.send(
      Channel::Status,
      SCHEDULER,
      SUPERVISOR,
      MessageKind::Status,
      content,
    );
  }
}
