use brine_review::FeedbackRecord;
use serde::Serialize;

use crate::context::RunContext;
use crate::status::WorkflowStatus;

/// Everything a run produces, owned by the scheduler while the run is live.
#[derive(Debug, Clone, Serialize)]
pub struct RunState {
  pub(crate) status: WorkflowStatus,
  pub(crate) context: RunContext,
  pub(crate) feedback: Vec<FeedbackRecord>,
}

impl RunState {
  pub(crate) fn new(status: WorkflowStatus) -> Self {
    Self {
      status,
      context: RunContext::new(),
      feedback: Vec::new(),
    }
  }

  pub fn status(&self) -> &WorkflowStatus {
    &self.status
  }

  pub fn context(&self) -> &RunContext {
    &self.context
  }

  /// Feedback records in the order units produced their output.
  pub fn feedback(&self) -> &[FeedbackRecord] {
    &self.feedback
  }

  pub fn into_parts(self) -> (WorkflowStatus, RunContext, Vec<FeedbackRecord>) {
    (self.status, self.context, self.feedback)
  }
}
