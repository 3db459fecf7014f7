use brine_workflow::OrderedPlan;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
  Initialized,
  Running,
  Completed,
  Failed,
}

impl RunStatus {
  pub fn is_terminal(&self) -> bool {
    matches!(self, RunStatus::Completed | RunStatus::Failed)
  }
}

/// Progress of one run through its plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStatus {
  pub run_id: String,
  pub start_time: DateTime<Utc>,
  pub current_stage: Option<String>,
  pub completed_stages: Vec<String>,
  pub pending_stages: Vec<String>,
  pub status: RunStatus,
  pub finished_at: Option<DateTime<Utc>>,
}

impl WorkflowStatus {
  pub fn new(run_id: impl Into<String>, plan: &OrderedPlan) -> Self {
    let pending_stages = plan.stage_names();
    Self {
      run_id: run_id.into(),
      start_time: Utc::now(),
      current_stage: pending_stages.first().cloned(),
      completed_stages: Vec::new(),
      pending_stages,
      status: RunStatus::Initialized,
      finished_at: None,
    }
  }

  pub(crate) fn begin_stage(&mut self, stage: &str) {
    self.status = RunStatus::Running;
    self.current_stage = Some(stage.to_string());
  }

  pub(crate) fn complete_stage(&mut self, stage: &str) {
    self.pending_stages.retain(|pending| pending != stage);
    self.completed_stages.push(stage.to_string());
  }

  pub(crate) fn mark_completed(&mut self) {
    self.status = RunStatus::Completed;
    self.current_stage = None;
    self.finished_at = Some(Utc::now());
  }

  /// Fail the run; `current_stage` keeps pointing at the stage that was running.
  pub(crate) fn mark_failed(&mut self) {
    self.status = RunStatus::Failed;
    self.finished_at = Some(Utc::now());
  }
}
