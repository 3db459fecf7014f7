use brine_unit::UnitError;
use thiserror::Error;

use crate::state::RunState;

#[derive(Debug, Error)]
pub enum RunError {
  #[error("unit '{unit}' is not registered")]
  UnitNotRegistered { unit: String },

  #[error("unit '{unit}' is not part of the plan")]
  UnitNotInPlan { unit: String },

  #[error("failed to initialize unit '{unit}'")]
  Initialization {
    unit: String,
    #[source]
    source: UnitError,
  },

  #[error("unit '{unit}' needs an output directory but none is configured")]
  NoArtifactDir { unit: String },

  #[error("failed to create output directory for unit '{unit}'")]
  OutputDirectory {
    unit: String,
    #[source]
    source: std::io::Error,
  },

  #[error("unit '{unit}' in stage '{stage}' is missing the output of '{dependency}'")]
  MissingDependency {
    stage: String,
    unit: String,
    dependency: String,
  },

  #[error("unit '{unit}' in stage '{stage}' failed")]
  Unit {
    stage: String,
    unit: String,
    #[source]
    source: UnitError,
  },

  #[error("output of unit '{unit}' in stage '{stage}' was rejected: {reason}")]
  OutputRejected {
    stage: String,
    unit: String,
    reason: String,
  },

  #[error("output of unit '{unit}' in stage '{stage}' did not pass review: {}", .issues.join("; "))]
  FeedbackRejected {
    stage: String,
    unit: String,
    issues: Vec<String>,
  },

  #[error("unit '{unit}' in stage '{stage}' timed out after {timeout_ms}ms")]
  Timeout {
    stage: String,
    unit: String,
    timeout_ms: u64,
  },

  #[error("run exceeded its timeout of {timeout_ms}ms")]
  GlobalTimeoutExceeded { timeout_ms: u64 },

  #[error("run cancelled")]
  Cancelled,

  #[error("task for unit '{unit}' in stage '{stage}' did not finish: {message}")]
  Join {
    stage: String,
    unit: String,
    message: String,
  },
}

impl RunError {
  /// Stage the error is attributed to, if any.
  pub fn stage(&self) -> Option<&str> {
    match self {
      RunError::MissingDependency { stage, .. }
      | RunError::Unit { stage, .. }
      | RunError::OutputRejected { stage, .. }
      | RunError::FeedbackRejected { stage, .. }
      | RunError::Timeout { stage, .. }
      | RunError::Join { stage, .. } => Some(stage.as_str()),
      _ => None,
    }
  }

  /// Unit the error is attributed to, if any.
  pub fn unit(&self) -> Option<&str> {
    match self {
      RunError::UnitNotRegistered { unit }
      | RunError::UnitNotInPlan { unit }
      | RunError::Initialization { unit, .. }
      | RunError::NoArtifactDir { unit }
      | RunError::OutputDirectory { unit, .. }
      | RunError::MissingDependency { unit, .. }
      | RunError::Unit { unit, .. }
      | RunError::OutputRejected { unit, .. }
      | RunError::FeedbackRejected { unit, .. }
      | RunError::Timeout { unit, .. }
      | RunError::Join { unit, .. } => Some(unit.as_str()),
      RunError::GlobalTimeoutExceeded { .. } | RunError::Cancelled => None,
    }
  }
}

/// A failed run: the cause plus everything the run had produced so far.
#[derive(Debug, Error)]
#[error("workflow run {run_id} failed")]
pub struct RunFailure {
  pub run_id: String,
  #[source]
  pub error: RunError,
  pub state: Box<RunState>,
}
